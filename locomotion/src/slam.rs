/*!
Momentum boost (slam) module.

A satellite state machine beside the main locomotion states. A crouch press
while falling fast enough drives the entity straight down at a fixed speed
(a bounded-duration velocity override that suspends gravity). On landing the
fall speed is converted into a horizontal boost along the camera-relative
intent direction, weighted by how steeply the ground descends that way, and
handed to the slide engine as pending momentum rather than applied directly.
*/

use crate::collision::Vec3;
use crate::ground::GroundHit;
use crate::utils::{downhill_on, horizontal, normalize_or_zero, project_onto_plane, sanitize};

/// Tunables for slam trigger and landing conversion.
#[derive(Clone, Copy, Debug)]
pub struct SlamTuning {
    /// Minimum downward speed before a slam may trigger.
    pub min_fall_speed: f32,
    /// Downward speed enforced during the slam.
    pub fall_speed: f32,
    /// The slam aborts if landing takes longer than this.
    pub max_duration: f32,
    /// Cooldown between activations.
    pub cooldown: f32,

    /// Fraction of the slope-projected fall speed converted to horizontal.
    pub conversion: f32,
    /// Multiplier on the converted speed.
    pub boost_factor: f32,
    /// Minimum landing boost, applied even on flat ground.
    pub min_boost: f32,
    /// Hard ceiling on the landing boost.
    pub max_boost: f32,
    /// How strongly the boost direction bends toward true downhill, scaled
    /// by slope steepness.
    pub downhill_bias: f32,
    /// Speed multiplier when the intent direction points uphill.
    pub uphill_penalty: f32,

    /// Time-to-live of the pending momentum deposited at landing.
    pub momentum_ttl: f32,
}

impl Default for SlamTuning {
    fn default() -> Self {
        Self {
            min_fall_speed: 8.0,
            fall_speed: 40.0,
            max_duration: 3.0,
            cooldown: 1.5,
            conversion: 0.9,
            boost_factor: 1.4,
            min_boost: 10.0,
            max_boost: 35.0,
            downhill_bias: 0.8,
            uphill_penalty: 0.5,
            momentum_ttl: 0.6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum SlamState {
    Idle,
    Falling { elapsed: f32 },
}

/// The slam state machine. One per entity.
#[derive(Clone, Debug)]
pub struct Slam {
    state: SlamState,
    cooldown_remaining: f32,
    tuning: SlamTuning,
}

impl Slam {
    pub fn new(tuning: SlamTuning) -> Self {
        Self {
            state: SlamState::Idle,
            cooldown_remaining: 0.0,
            tuning,
        }
    }

    #[inline]
    pub fn tuning(&self) -> &SlamTuning {
        &self.tuning
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.state, SlamState::Falling { .. })
    }

    /// Attempt to start a slam. `vertical_velocity` is the entity's current
    /// y velocity. Mutual exclusion with slide/prone is the caller's job;
    /// cooldown and fall-speed gating is ours.
    pub fn try_trigger(&mut self, airborne: bool, vertical_velocity: f32) -> bool {
        if self.is_active() || !airborne || self.cooldown_remaining > 0.0 {
            return false;
        }
        if -vertical_velocity < self.tuning.min_fall_speed {
            return false;
        }
        self.state = SlamState::Falling { elapsed: 0.0 };
        self.cooldown_remaining = self.tuning.cooldown;
        log::debug!("slam triggered at {:.1} m/s fall", -vertical_velocity);
        true
    }

    /// The velocity override driving the slam descent.
    #[inline]
    pub fn descent_velocity(&self) -> Vec3 {
        Vec3::new(0.0, -self.tuning.fall_speed, 0.0)
    }

    /// Advance timers. Returns true if the slam timed out this tick and the
    /// caller must clear the descent override.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
        if let SlamState::Falling { elapsed } = &mut self.state {
            *elapsed += dt;
            if *elapsed > self.tuning.max_duration {
                log::debug!("slam timed out before landing");
                self.state = SlamState::Idle;
                return true;
            }
        }
        false
    }

    /// Abort without landing (forced reset, dive cancel).
    pub fn cancel(&mut self) {
        self.state = SlamState::Idle;
    }

    /// Landing conversion. `intent_dir` is the camera-relative input
    /// direction, already falling back to camera/entity forward when idle.
    /// Returns the pending-momentum vector, or `None` if the slam was not
    /// active or no usable direction exists.
    pub fn on_landing(
        &mut self,
        ground: Option<&GroundHit>,
        fall_speed: f32,
        intent_dir: Vec3,
    ) -> Option<Vec3> {
        if !self.is_active() {
            return None;
        }
        self.state = SlamState::Idle;

        let dir = normalize_or_zero(horizontal(sanitize(intent_dir)));
        if dir.norm_squared() < 0.5 {
            return None;
        }
        let fall_speed = fall_speed.abs();

        let (normal, slope_deg) = match ground {
            Some(hit) => (hit.normal, hit.slope_deg),
            None => (crate::utils::up(), 0.0),
        };
        let slope_sin = slope_deg.to_radians().sin();

        // Does the surface descend along the intent direction?
        let on_plane = project_onto_plane(dir, normal);
        let descending = on_plane.y < -1.0e-3;
        let ascending = on_plane.y > 1.0e-3;

        let converted = if descending {
            fall_speed * slope_sin * self.tuning.conversion
        } else {
            0.0
        };
        let mut speed =
            (converted * self.tuning.boost_factor).clamp(self.tuning.min_boost, self.tuning.max_boost);
        if ascending {
            speed *= self.tuning.uphill_penalty;
        }

        // Bend toward true downhill in proportion to steepness.
        let mut out_dir = dir;
        if descending {
            let downhill = normalize_or_zero(horizontal(downhill_on(normal)));
            if downhill.norm_squared() > 0.5 {
                let bias = (self.tuning.downhill_bias * slope_sin).clamp(0.0, 1.0);
                out_dir = normalize_or_zero(dir.lerp(&downhill, bias));
            }
        }

        log::debug!("slam landed: boost {speed:.1} m/s");
        Some(out_dir * speed)
    }
}

impl Default for Slam {
    fn default() -> Self {
        Self::new(SlamTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::up;

    fn slope_hit(deg: f32) -> GroundHit {
        let rad = deg.to_radians();
        GroundHit {
            point: Vec3::zeros(),
            normal: Vec3::new(rad.sin(), rad.cos(), 0.0),
            slope_deg: deg,
        }
    }

    #[test]
    fn trigger_requires_fall_speed_and_cooldown() {
        let mut slam = Slam::default();
        assert!(!slam.try_trigger(true, -2.0), "too slow a fall");
        assert!(!slam.try_trigger(false, -20.0), "grounded");
        assert!(slam.try_trigger(true, -20.0));
        assert!(slam.is_active());

        slam.on_landing(None, 20.0, Vec3::new(1.0, 0.0, 0.0));
        assert!(!slam.try_trigger(true, -20.0), "cooldown holds");
        slam.tick(2.0);
        assert!(slam.try_trigger(true, -20.0));
    }

    #[test]
    fn times_out_without_landing() {
        let mut slam = Slam::default();
        assert!(slam.try_trigger(true, -20.0));
        assert!(!slam.tick(1.0));
        assert!(slam.tick(2.5), "must report timeout");
        assert!(!slam.is_active());
    }

    #[test]
    fn flat_landing_boost_stays_within_clamps() {
        let mut slam = Slam::default();
        let tuning = *slam.tuning();
        assert!(slam.try_trigger(true, -20.0));

        let flat = GroundHit {
            point: Vec3::zeros(),
            normal: up(),
            slope_deg: 0.0,
        };
        // Terminal-speed fall onto flat ground.
        let boost = slam
            .on_landing(Some(&flat), 55.0, Vec3::new(0.0, 0.0, 1.0))
            .expect("boost");
        let speed = boost.norm();
        assert!(speed >= tuning.min_boost);
        assert!(speed <= tuning.max_boost);
    }

    #[test]
    fn steep_downhill_landing_converts_fall_speed() {
        let mut slam = Slam::default();
        let tuning = *slam.tuning();
        assert!(slam.try_trigger(true, -40.0));

        let hit = slope_hit(45.0);
        // Intent toward +x, which descends on this plane.
        let boost = slam
            .on_landing(Some(&hit), 40.0, Vec3::new(1.0, 0.0, 0.0))
            .expect("boost");
        let speed = boost.norm();
        assert!(speed > tuning.min_boost, "conversion beats the floor");
        assert!(speed <= tuning.max_boost);
        assert!(boost.x > 0.0);
    }

    #[test]
    fn uphill_intent_is_penalized() {
        let mut slam = Slam::default();
        assert!(slam.try_trigger(true, -40.0));
        let hit = slope_hit(30.0);
        let uphill = slam
            .on_landing(Some(&hit), 40.0, Vec3::new(-1.0, 0.0, 0.0))
            .expect("boost");

        let mut slam2 = Slam::default();
        slam2.tick(0.0);
        assert!(slam2.try_trigger(true, -40.0));
        let downhill = slam2
            .on_landing(Some(&hit), 40.0, Vec3::new(1.0, 0.0, 0.0))
            .expect("boost");

        assert!(uphill.norm() < downhill.norm());
    }

    #[test]
    fn landing_without_active_slam_yields_nothing() {
        let mut slam = Slam::default();
        assert!(slam.on_landing(None, 30.0, Vec3::new(1.0, 0.0, 0.0)).is_none());
    }
}
