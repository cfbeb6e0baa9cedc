/*!
Input and orientation data consumed each tick.

The core does no device abstraction: a collaborator hands it digital button
edges and analog axes already resolved for this frame. [`InputTracker`] is a
small convenience for hosts that only have raw held booleans and want edges
derived for them.
*/

use crate::collision::Vec3;
use crate::utils::{normalize_or_zero, up};

/// Edge-resolved state of one digital button for the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonFrame {
    /// Went down this frame.
    pub pressed: bool,
    /// Currently held (includes the press frame).
    pub held: bool,
    /// Went up this frame.
    pub released: bool,
}

impl ButtonFrame {
    pub const IDLE: Self = Self {
        pressed: false,
        held: false,
        released: false,
    };

    /// A press edge (also held).
    pub const PRESSED: Self = Self {
        pressed: true,
        held: true,
        released: false,
    };

    /// Held without an edge.
    pub const HELD: Self = Self {
        pressed: false,
        held: true,
        released: false,
    };
}

/// Everything the input collaborator exposes for one frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputFrame {
    pub crouch: ButtonFrame,
    pub jump: ButtonFrame,
    pub dive: ButtonFrame,
    pub sprint: ButtonFrame,
    /// Sideways intent in [-1, 1]; positive is right.
    pub strafe: f32,
    /// Forward intent in [-1, 1]; positive is forward.
    pub forward: f32,
}

impl InputFrame {
    /// True if either axis carries meaningful intent.
    #[inline]
    pub fn has_move_intent(&self) -> bool {
        self.strafe.abs() > 0.2 || self.forward.abs() > 0.2
    }
}

/// Orientation collaborator snapshot: where the camera (or the entity, when
/// no camera exists) is facing. Read-only.
#[derive(Clone, Copy, Debug)]
pub struct OrientationFrame {
    pub forward: Vec3,
    pub right: Vec3,
}

impl OrientationFrame {
    pub fn new(forward: Vec3, right: Vec3) -> Self {
        Self { forward, right }
    }

    /// Facing along a yaw-only forward vector; right derived from it.
    pub fn from_forward(forward: Vec3) -> Self {
        let f = normalize_or_zero(forward);
        Self {
            forward: f,
            right: normalize_or_zero(up().cross(&f)),
        }
    }

    /// World-space horizontal wish direction for the given axes, or zero when idle.
    pub fn wish_direction(&self, strafe: f32, forward: f32) -> Vec3 {
        let f = normalize_or_zero(Vec3::new(self.forward.x, 0.0, self.forward.z));
        let r = normalize_or_zero(Vec3::new(self.right.x, 0.0, self.right.z));
        normalize_or_zero(f * forward.clamp(-1.0, 1.0) + r * strafe.clamp(-1.0, 1.0))
    }

    /// Horizontal forward, used when the axes are idle.
    #[inline]
    pub fn flat_forward(&self) -> Vec3 {
        normalize_or_zero(Vec3::new(self.forward.x, 0.0, self.forward.z))
    }
}

/// Derives per-frame button edges from raw held booleans.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputTracker {
    crouch: bool,
    jump: bool,
    dive: bool,
    sprint: bool,
}

impl InputTracker {
    /// Build an [`InputFrame`] from this frame's raw held state.
    pub fn frame(
        &mut self,
        crouch: bool,
        jump: bool,
        dive: bool,
        sprint: bool,
        strafe: f32,
        forward: f32,
    ) -> InputFrame {
        let frame = InputFrame {
            crouch: edge(self.crouch, crouch),
            jump: edge(self.jump, jump),
            dive: edge(self.dive, dive),
            sprint: edge(self.sprint, sprint),
            strafe,
            forward,
        };
        self.crouch = crouch;
        self.jump = jump;
        self.dive = dive;
        self.sprint = sprint;
        frame
    }
}

#[inline]
fn edge(was: bool, now: bool) -> ButtonFrame {
    ButtonFrame {
        pressed: now && !was,
        held: now,
        released: was && !now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_edges_once() {
        let mut tracker = InputTracker::default();

        let f = tracker.frame(true, false, false, false, 0.0, 0.0);
        assert!(f.crouch.pressed && f.crouch.held);

        let f = tracker.frame(true, false, false, false, 0.0, 0.0);
        assert!(!f.crouch.pressed && f.crouch.held);

        let f = tracker.frame(false, false, false, false, 0.0, 0.0);
        assert!(f.crouch.released && !f.crouch.held);
    }

    #[test]
    fn wish_direction_is_camera_relative_and_horizontal() {
        let orient = OrientationFrame::new(
            Vec3::new(0.0, -0.5, 1.0).normalize(),
            Vec3::new(1.0, 0.0, 0.0),
        );

        let wish = orient.wish_direction(0.0, 1.0);
        assert!((wish - Vec3::new(0.0, 0.0, 1.0)).norm() < 1.0e-4);

        let wish = orient.wish_direction(1.0, 0.0);
        assert!((wish - Vec3::new(1.0, 0.0, 0.0)).norm() < 1.0e-4);

        assert_eq!(orient.wish_direction(0.0, 0.0), Vec3::zeros());
    }
}
