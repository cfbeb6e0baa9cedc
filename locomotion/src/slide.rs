/*!
Slide/slope physics engine.

A [`SlideSession`] exists only while the entity is sliding and is the single
source of truth for horizontal motion during that window. Each tick it
classifies the probed slope, integrates gravity along the surface with
asymmetric uphill resistance, realigns toward the downhill direction on steep
ground, applies speed-responsive friction, steers from player intent, clamps
speed, and evaluates stop conditions. Losing the ground mid-slide captures the
horizontal velocity for a pending-momentum handoff.
*/

use crate::collision::Vec3;
use crate::events::SlideEndReason;
use crate::ground::GroundHit;
use crate::utils::{
    downhill_on, exp_blend, horizontal, lerp, normalize_or_zero, project_onto_plane, sanitize, up,
};

/// Tunables for the slide engine. Speeds in m/s, angles in degrees.
#[derive(Clone, Copy, Debug)]
pub struct SlideTuning {
    /// Entry speed at or above which a crouch press starts a slide.
    pub min_start_speed: f32,
    /// Below this the session force-stops immediately (anti-jitter).
    pub stop_speed: f32,
    /// Below this on non-steep ground the slide is no longer useful.
    pub useful_speed: f32,
    /// Absolute speed ceiling.
    pub max_safe_speed: f32,
    /// Ceiling raise while on a steep slope.
    pub steep_extra_speed: f32,

    /// Slopes shallower than this are flat.
    pub flat_angle_deg: f32,
    /// Slopes steeper than this are steep (auto-slide, raised ceiling).
    pub steep_angle_deg: f32,

    /// Base friction coefficient (per second, scaled by speed).
    pub friction: f32,
    /// Friction multiplier at near-zero speed.
    pub friction_low_speed_scale: f32,
    /// Friction multiplier at the speed ceiling.
    pub friction_high_speed_scale: f32,
    /// Extra scrub right after a slope-to-flat transition.
    pub flat_transition_boost: f32,
    /// Window after leaving a slope during which the scrub boost applies.
    pub flat_transition_window: f32,
    /// Friction multiplier during the first instants of a slide.
    pub early_friction_scale: f32,
    /// Length of the early-slide friction grace.
    pub early_grace: f32,

    /// Uphill resistance scale at low speed (stronger, helps stopping).
    pub uphill_low_speed_scale: f32,
    /// Uphill resistance scale at the ceiling (weaker, avoids a hard wall).
    pub uphill_high_speed_scale: f32,

    /// Misalignment from downhill tolerated before realignment kicks in.
    pub realign_margin_deg: f32,
    /// Realignment rate at a 90-degree slope; scales with sin(slope).
    pub realign_rate: f32,

    /// Steering acceleration from lateral intent.
    pub steer_accel: f32,
    /// Blend rate pulling velocity toward the steered target.
    pub steer_blend_rate: f32,
    /// Braking deceleration from backward intent.
    pub brake_decel: f32,

    /// Ground-loss grace before the slide ends airborne.
    pub ground_grace: f32,
    /// Rate for smoothing the ground normal across ticks.
    pub normal_blend_rate: f32,

    /// Duration budget base.
    pub base_duration: f32,
    /// Budget bonus per m/s of entry speed above the start threshold.
    pub bonus_duration_per_speed: f32,
    /// Minimum time before the too-slow stop condition may fire.
    pub min_duration: f32,

    /// Fraction of terminal horizontal speed handed back on voluntary exit.
    pub exit_transfer: f32,
    /// Exit residuals below this are zeroed instead of transferred.
    pub exit_min_speed: f32,
}

impl Default for SlideTuning {
    fn default() -> Self {
        Self {
            min_start_speed: 6.0,
            stop_speed: 2.0,
            useful_speed: 3.5,
            max_safe_speed: 30.0,
            steep_extra_speed: 5.0,
            flat_angle_deg: 4.0,
            steep_angle_deg: 25.0,
            friction: 0.55,
            friction_low_speed_scale: 1.3,
            friction_high_speed_scale: 0.6,
            flat_transition_boost: 2.2,
            flat_transition_window: 0.4,
            early_friction_scale: 0.25,
            early_grace: 0.35,
            uphill_low_speed_scale: 1.7,
            uphill_high_speed_scale: 0.6,
            realign_margin_deg: 8.0,
            realign_rate: 3.0,
            steer_accel: 9.0,
            steer_blend_rate: 6.0,
            brake_decel: 7.0,
            ground_grace: 0.2,
            normal_blend_rate: 12.0,
            base_duration: 1.2,
            bonus_duration_per_speed: 0.05,
            min_duration: 0.4,
            exit_transfer: 0.85,
            exit_min_speed: 2.0,
        }
    }
}

impl SlideTuning {
    /// Entry gate: moving fast enough, on a steep slope, or forced by a
    /// pending-momentum claim.
    pub fn allows_start(&self, speed: f32, slope_deg: f32, has_pending: bool) -> bool {
        speed >= self.min_start_speed || slope_deg >= self.steep_angle_deg || has_pending
    }
}

/// Result of one slide tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlideTick {
    /// Set when the session ended this tick.
    pub end: Option<SlideEndReason>,
    /// Horizontal momentum captured on a ground-loss end.
    pub captured_momentum: Option<Vec3>,
}

/// Live state of one slide. Exists iff the locomotion state is `Sliding`.
#[derive(Clone, Debug)]
pub struct SlideSession {
    velocity: Vec3,
    elapsed: f32,
    duration_budget: f32,
    smoothed_normal: Vec3,
    started_on_slope: bool,
    on_slope: bool,
    airborne_time: f32,
    time_since_slope: f32,
}

impl SlideSession {
    /// Begin a slide from the entity's current velocity and the ground under
    /// it. With no ground hit, flat ground is assumed.
    pub fn start(entry_velocity: Vec3, ground: Option<&GroundHit>, tuning: &SlideTuning) -> Self {
        let entry_velocity = sanitize(entry_velocity);
        let (normal, slope_deg) = match ground {
            Some(hit) => (hit.normal, hit.slope_deg),
            None => (up(), 0.0),
        };
        let velocity = project_onto_plane(entry_velocity, normal);
        let speed = velocity.norm();
        let on_slope = slope_deg > tuning.flat_angle_deg;
        let bonus = (speed - tuning.min_start_speed).max(0.0) * tuning.bonus_duration_per_speed;
        log::debug!("slide started: {speed:.1} m/s on {slope_deg:.0} deg slope");
        Self {
            velocity,
            elapsed: 0.0,
            duration_budget: tuning.base_duration + bonus,
            smoothed_normal: normal,
            started_on_slope: on_slope,
            on_slope,
            airborne_time: 0.0,
            time_since_slope: if on_slope { 0.0 } else { f32::MAX },
        }
    }

    /// Current slide velocity, tangent to the smoothed ground plane.
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    #[inline]
    pub fn on_slope(&self) -> bool {
        self.on_slope
    }

    /// Horizontal velocity handed back on a voluntary exit: a fraction of
    /// terminal speed, zeroed below the residual floor.
    pub fn exit_velocity(&self, tuning: &SlideTuning) -> Vec3 {
        let out = horizontal(self.velocity) * tuning.exit_transfer;
        if out.norm() < tuning.exit_min_speed {
            Vec3::zeros()
        } else {
            out
        }
    }

    /// Horizontal momentum for a handoff (jump-out, ground loss).
    #[inline]
    pub fn capture_momentum(&self) -> Vec3 {
        horizontal(self.velocity)
    }

    /// Advance the slide one tick. `wish_dir` is the slope-unprojected
    /// horizontal intent; `gravity` the downward acceleration magnitude.
    pub fn tick(
        &mut self,
        ground: Option<&GroundHit>,
        wish_dir: Vec3,
        gravity: f32,
        dt: f32,
        tuning: &SlideTuning,
    ) -> SlideTick {
        self.elapsed += dt;

        let Some(hit) = ground else {
            self.airborne_time += dt;
            // Near a slope the grace is forgiving; off one it is strict.
            if self.airborne_time > tuning.ground_grace && !self.on_slope {
                return SlideTick {
                    end: Some(SlideEndReason::LostGround),
                    captured_momentum: Some(self.capture_momentum()),
                };
            }
            return SlideTick::default();
        };
        self.airborne_time = 0.0;

        let blend = exp_blend(tuning.normal_blend_rate, dt);
        self.smoothed_normal = normalize_or_zero(self.smoothed_normal.lerp(&hit.normal, blend));
        if self.smoothed_normal.norm_squared() < 0.5 {
            self.smoothed_normal = up();
        }
        let normal = self.smoothed_normal;
        let slope_deg = up().dot(&normal).clamp(-1.0, 1.0).acos().to_degrees();
        let was_on_slope = self.on_slope;
        self.on_slope = slope_deg > tuning.flat_angle_deg;
        let steep = slope_deg >= tuning.steep_angle_deg;
        if self.on_slope {
            self.time_since_slope = 0.0;
        } else if was_on_slope {
            self.time_since_slope = 0.0;
        } else if self.time_since_slope < f32::MAX {
            self.time_since_slope += dt;
        }

        // Keep velocity tangent to the (smoothed) surface.
        self.velocity = project_onto_plane(self.velocity, normal);

        self.integrate_slope_forces(normal, slope_deg, gravity, dt, tuning);
        self.realign_downhill(normal, slope_deg, dt, tuning);
        self.apply_friction(dt, tuning);
        self.steer(normal, wish_dir, dt, tuning);
        self.clamp_speed(steep, tuning);

        self.evaluate_stop(steep, tuning)
    }

    fn integrate_slope_forces(
        &mut self,
        normal: Vec3,
        slope_deg: f32,
        gravity: f32,
        dt: f32,
        tuning: &SlideTuning,
    ) {
        if slope_deg <= tuning.flat_angle_deg {
            return;
        }
        let downhill = downhill_on(normal);
        if downhill.norm_squared() < 0.5 {
            return;
        }
        let accel = gravity * slope_deg.to_radians().sin();
        let speed = self.speed();
        if self.velocity.dot(&downhill) >= 0.0 || speed < 1.0e-3 {
            self.velocity += downhill * (accel * dt);
        } else {
            // Uphill: resistance of the same magnitude family, strong at low
            // speed so the climb actually ends, weak at high speed.
            let t = (speed / tuning.max_safe_speed).clamp(0.0, 1.0);
            let scale = lerp(tuning.uphill_low_speed_scale, tuning.uphill_high_speed_scale, t);
            let decel = accel * scale * dt;
            let dir = self.velocity / speed;
            self.velocity = dir * (speed - decel).max(0.0);
        }
    }

    fn realign_downhill(&mut self, normal: Vec3, slope_deg: f32, dt: f32, tuning: &SlideTuning) {
        let speed = self.speed();
        if speed < 1.0e-3 {
            return;
        }
        let downhill = downhill_on(normal);
        if downhill.norm_squared() < 0.5 {
            return;
        }
        let dir = self.velocity / speed;
        // Only when actually moving downhill; uphill motion is left alone.
        if dir.dot(&downhill) <= 0.0 {
            return;
        }
        let misalign = dir.dot(&downhill).clamp(-1.0, 1.0).acos().to_degrees();
        if misalign <= tuning.realign_margin_deg {
            return;
        }
        let pull = tuning.realign_rate * slope_deg.to_radians().sin() * dt;
        let new_dir = normalize_or_zero(dir.lerp(&downhill, pull.clamp(0.0, 1.0)));
        if new_dir.norm_squared() > 0.5 {
            self.velocity = new_dir * speed;
        }
    }

    fn apply_friction(&mut self, dt: f32, tuning: &SlideTuning) {
        let speed = self.speed();
        if speed < 1.0e-3 {
            return;
        }
        let t = (speed / tuning.max_safe_speed).clamp(0.0, 1.0);
        let mut coeff = tuning.friction
            * lerp(tuning.friction_low_speed_scale, tuning.friction_high_speed_scale, t);
        if !self.on_slope && self.time_since_slope < tuning.flat_transition_window {
            coeff *= tuning.flat_transition_boost;
        }
        if self.elapsed < tuning.early_grace {
            coeff *= tuning.early_friction_scale;
        }
        let dir = self.velocity / speed;
        self.velocity -= dir * (speed * coeff * dt);
    }

    fn steer(&mut self, normal: Vec3, wish_dir: Vec3, dt: f32, tuning: &SlideTuning) {
        let wish = normalize_or_zero(project_onto_plane(sanitize(wish_dir), normal));
        if wish.norm_squared() < 0.5 {
            return;
        }
        let speed = self.speed();
        if speed < 1.0e-3 {
            return;
        }
        let dir = self.velocity / speed;
        let along = wish.dot(&dir);

        if along < -0.5 {
            // Backward input brakes toward a floor, never reverses.
            let braked = (speed - tuning.brake_decel * dt).max(tuning.stop_speed);
            self.velocity = dir * braked;
            return;
        }
        if along > 0.5 {
            // Forward input never adds speed.
            return;
        }

        // Lateral steering power grows with speed.
        let power = (speed / tuning.min_start_speed).clamp(0.5, 2.0);
        let target = self.velocity + wish * (tuning.steer_accel * power * dt);
        let blended = self.velocity.lerp(&target, exp_blend(tuning.steer_blend_rate, dt));
        // Steering redirects, it must not add speed.
        self.velocity = normalize_or_zero(blended) * speed;
    }

    fn clamp_speed(&mut self, steep: bool, tuning: &SlideTuning) {
        self.velocity = sanitize(self.velocity);
        let ceiling = tuning.max_safe_speed + if steep { tuning.steep_extra_speed } else { 0.0 };
        let speed = self.speed();
        if speed > ceiling {
            self.velocity *= ceiling / speed;
        }
    }

    fn evaluate_stop(&self, steep: bool, tuning: &SlideTuning) -> SlideTick {
        let speed = self.speed();
        if speed < tuning.stop_speed {
            return SlideTick {
                end: Some(SlideEndReason::TooSlow),
                captured_momentum: None,
            };
        }
        if speed < tuning.useful_speed && !steep && self.elapsed > tuning.min_duration {
            return SlideTick {
                end: Some(SlideEndReason::TooSlow),
                captured_momentum: None,
            };
        }
        if self.elapsed > self.duration_budget && !self.on_slope && speed < tuning.min_start_speed {
            return SlideTick {
                end: Some(SlideEndReason::TimedOut),
                captured_momentum: None,
            };
        }
        SlideTick::default()
    }
}
