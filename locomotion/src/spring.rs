/*!
Damped-spring integrator.

A reusable `{offset, velocity}` pair advanced by semi-implicit integration,
used for landing vertical compression and forward landing tilt. Stiffness and
damping choose the regime: `damping == 2*sqrt(stiffness)` is critical,
anything above is over-damped (monotonic return, no bounce).
*/

use crate::utils::sanitize_scalar;

/// A one-dimensional damped spring settling toward zero offset.
#[derive(Clone, Copy, Debug)]
pub struct DampedSpring {
    /// Current displacement from rest.
    pub offset: f32,
    /// Current velocity of the displacement.
    pub velocity: f32,
    stiffness: f32,
    damping: f32,
}

impl DampedSpring {
    pub fn new(stiffness: f32, damping: f32) -> Self {
        Self {
            offset: 0.0,
            velocity: 0.0,
            stiffness: stiffness.max(0.0),
            damping: damping.max(0.0),
        }
    }

    /// Critically damped spring for the given stiffness.
    pub fn critically_damped(stiffness: f32) -> Self {
        Self::new(stiffness, 2.0 * stiffness.max(0.0).sqrt())
    }

    /// Damping at or above critical for the current stiffness.
    #[inline]
    pub fn is_overdamped(&self) -> bool {
        self.damping >= 2.0 * self.stiffness.sqrt()
    }

    /// Kick the spring with an instantaneous velocity change.
    #[inline]
    pub fn impulse(&mut self, delta_velocity: f32) {
        self.velocity += delta_velocity;
    }

    /// Displace the spring instantly (e.g. compress on landing).
    #[inline]
    pub fn deflect(&mut self, offset: f32) {
        self.offset += offset;
    }

    /// Advance the spring by `dt` seconds and return the new offset.
    pub fn tick(&mut self, dt: f32) -> f32 {
        if dt <= 0.0 {
            return self.offset;
        }
        let accel = -self.stiffness * self.offset - self.damping * self.velocity;
        self.velocity += accel * dt;
        self.offset += self.velocity * dt;

        // One bad frame must not stick; scrub and restart from rest.
        self.velocity = sanitize_scalar(self.velocity);
        self.offset = sanitize_scalar(self.offset);
        self.offset
    }

    /// True once both offset and velocity are within `eps` of rest.
    #[inline]
    pub fn is_settled(&self, eps: f32) -> bool {
        self.offset.abs() <= eps && self.velocity.abs() <= eps
    }

    /// Snap back to rest.
    #[inline]
    pub fn reset(&mut self) {
        self.offset = 0.0;
        self.velocity = 0.0;
    }
}
