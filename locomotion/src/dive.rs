/*!
Dive sessions.

A dive is a two-phase maneuver: a ballistic airborne launch (this module sets
the initial velocity; gravity stays with the body) followed by a grounded
prone slide whose horizontal velocity decays linearly to zero. Ordinary
movement input is blocked for the whole session.
*/

use crate::collision::Vec3;
use crate::utils::{horizontal, normalize_or_zero, sanitize};

/// Tunables for dive launch and the prone ground phase.
#[derive(Clone, Copy, Debug)]
pub struct DiveTuning {
    /// Horizontal launch speed along the facing direction.
    pub forward_speed: f32,
    /// Upward launch speed.
    pub up_speed: f32,
    /// Linear deceleration while prone (m/s^2).
    pub prone_friction: f32,
    /// Prone ends after this long even with no input.
    pub prone_max_duration: f32,
    /// Cooldown between dives.
    pub cooldown: f32,
}

impl Default for DiveTuning {
    fn default() -> Self {
        Self {
            forward_speed: 9.0,
            up_speed: 4.5,
            prone_friction: 10.0,
            prone_max_duration: 2.0,
            cooldown: 1.0,
        }
    }
}

/// Which half of the dive is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DivePhase {
    Airborne,
    Prone,
}

/// Live state of one dive. Exists iff the locomotion state is Diving or Prone.
#[derive(Clone, Debug)]
pub struct DiveSession {
    phase: DivePhase,
    /// Velocity at launch; ground velocity once prone.
    velocity: Vec3,
    elapsed: f32,
    prone_elapsed: f32,
}

impl DiveSession {
    /// Launch a dive along `facing` (horizontalized), carrying any existing
    /// horizontal speed if it exceeds the launch speed.
    pub fn launch(facing: Vec3, current_velocity: Vec3, tuning: &DiveTuning) -> Self {
        let dir = normalize_or_zero(horizontal(facing));
        let carried = horizontal(sanitize(current_velocity)).norm();
        let speed = tuning.forward_speed.max(carried);
        let velocity = dir * speed + Vec3::new(0.0, tuning.up_speed, 0.0);
        log::debug!("dive launched at {speed:.1} m/s");
        Self {
            phase: DivePhase::Airborne,
            velocity,
            elapsed: 0.0,
            prone_elapsed: 0.0,
        }
    }

    #[inline]
    pub fn phase(&self) -> DivePhase {
        self.phase
    }

    /// Launch velocity (airborne) or current ground velocity (prone).
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Transition to the prone ground phase: horizontal impact velocity
    /// becomes the decaying ground velocity. Returns the impact speed.
    pub fn land(&mut self, impact_velocity: Vec3) -> f32 {
        self.velocity = horizontal(sanitize(impact_velocity));
        self.phase = DivePhase::Prone;
        self.prone_elapsed = 0.0;
        self.velocity.norm()
    }

    /// Advance one tick. Returns true while the session should continue;
    /// false once the prone phase has timed out.
    pub fn tick(&mut self, dt: f32, tuning: &DiveTuning) -> bool {
        self.elapsed += dt;
        match self.phase {
            DivePhase::Airborne => true,
            DivePhase::Prone => {
                self.prone_elapsed += dt;
                let speed = self.velocity.norm();
                if speed > 0.0 {
                    let decayed = (speed - tuning.prone_friction * dt).max(0.0);
                    self.velocity = if decayed > 0.0 {
                        self.velocity * (decayed / speed)
                    } else {
                        Vec3::zeros()
                    };
                }
                self.prone_elapsed < tuning.prone_max_duration
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_combines_facing_and_lift() {
        let tuning = DiveTuning::default();
        let dive = DiveSession::launch(
            Vec3::new(0.0, -0.3, 1.0),
            Vec3::zeros(),
            &tuning,
        );
        assert_eq!(dive.phase(), DivePhase::Airborne);
        let v = dive.velocity();
        assert!((v.z - tuning.forward_speed).abs() < 1.0e-3);
        assert!((v.y - tuning.up_speed).abs() < 1.0e-3);
        assert!(v.x.abs() < 1.0e-6);
    }

    #[test]
    fn launch_keeps_faster_existing_speed() {
        let tuning = DiveTuning::default();
        let dive = DiveSession::launch(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(14.0, -2.0, 0.0),
            &tuning,
        );
        assert!((dive.velocity().x - 14.0).abs() < 1.0e-3);
    }

    #[test]
    fn prone_decays_linearly_to_zero_then_times_out() {
        let tuning = DiveTuning::default();
        let mut dive = DiveSession::launch(Vec3::new(1.0, 0.0, 0.0), Vec3::zeros(), &tuning);
        let impact = dive.land(Vec3::new(8.0, -12.0, 0.0));
        assert!((impact - 8.0).abs() < 1.0e-3);
        assert_eq!(dive.phase(), DivePhase::Prone);

        let dt = 0.1;
        let mut alive = true;
        let mut elapsed = 0.0;
        while alive {
            alive = dive.tick(dt, &tuning);
            elapsed += dt;
            assert!(elapsed < tuning.prone_max_duration + 1.0);
        }
        assert_eq!(dive.velocity(), Vec3::zeros());
    }
}
