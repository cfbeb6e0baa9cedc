/*!
Kinematic body: the shared velocity/grounded provider and collider.

Owns the entity's position, velocity, capsule dimensions, and grounded
bookkeeping (instant and coyote-windowed). Vertical motion integrates gravity
unless a timed velocity override suspends it. All motion routes through the
collide-and-slide resolver, with an up-forward-down step attempt for small
ledges when horizontal motion is mostly blocked.

Height and center update together: [`KinematicBody::set_height`] keeps the
capsule's base fixed, so posture changes never push the entity into the floor
or leave it hovering.
*/

use crate::collision::{
    CapsuleSpec, PhysicsQuery, QueryFilter, ResolverTuning, Vec3, resolve_slide,
    settings::{GRAVITY_MPS2, SNAP_HOVER_HEIGHT, SNAP_MAX_DISTANCE},
};
use crate::ground::GroundHit;
use crate::overrides::ShapeParams;
use crate::utils::{horizontal, sanitize, sanitize_scalar};

/// Tunables for gravity and grounded bookkeeping.
#[derive(Clone, Copy, Debug)]
pub struct BodyTuning {
    /// Downward acceleration while airborne (m/s^2).
    pub gravity: f32,
    /// Terminal fall speed cap (m/s).
    pub terminal_fall_speed: f32,
    /// Forgiveness window after leaving ground (seconds).
    pub coyote_time: f32,
}

impl Default for BodyTuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY_MPS2,
            terminal_fall_speed: 55.0,
            coyote_time: 0.15,
        }
    }
}

/// A temporary velocity override with a duration, optionally suspending
/// ordinary gravity integration for its window.
#[derive(Clone, Copy, Debug)]
pub struct VelocityOverride {
    pub vector: Vec3,
    pub remaining: f32,
    pub suspend_gravity: bool,
}

/// The entity's kinematic state.
#[derive(Clone, Debug)]
pub struct KinematicBody {
    /// Capsule center in world space.
    pub position: Vec3,
    velocity: Vec3,
    radius: f32,
    height: f32,
    params: ShapeParams,
    grounded: bool,
    air_time: f32,
    ground: Option<GroundHit>,
    vel_override: Option<VelocityOverride>,
    tuning: BodyTuning,
}

impl KinematicBody {
    pub fn new(position: Vec3, radius: f32, height: f32) -> Self {
        Self {
            position,
            velocity: Vec3::zeros(),
            radius,
            height: height.max(2.0 * radius),
            params: ShapeParams::default(),
            grounded: false,
            air_time: f32::MAX,
            ground: None,
            vel_override: None,
            tuning: BodyTuning::default(),
        }
    }

    pub fn with_tuning(mut self, tuning: BodyTuning) -> Self {
        self.tuning = tuning;
        self
    }

    #[inline]
    pub fn capsule(&self) -> CapsuleSpec {
        CapsuleSpec::from_total_height(self.radius, self.height)
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Change the capsule height, keeping its base fixed.
    pub fn set_height(&mut self, height: f32) {
        let height = height.max(2.0 * self.radius);
        let base = self.position.y - self.height * 0.5;
        self.position.y = base + height * 0.5;
        self.height = height;
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[inline]
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = sanitize(velocity);
    }

    /// Overwrite only the horizontal component.
    pub fn set_horizontal_velocity(&mut self, velocity: Vec3) {
        let v = sanitize(velocity);
        self.velocity.x = v.x;
        self.velocity.z = v.z;
    }

    /// Scale the upward component of velocity, e.g. a jump-cut on button
    /// release. Downward motion is untouched.
    pub fn cut_vertical(&mut self, factor: f32) {
        if self.velocity.y > 0.0 {
            self.velocity.y *= sanitize_scalar(factor).clamp(0.0, 1.0);
        }
    }

    #[inline]
    pub fn shape_params(&self) -> &ShapeParams {
        &self.params
    }

    #[inline]
    pub fn shape_params_mut(&mut self) -> &mut ShapeParams {
        &mut self.params
    }

    /// Instant grounded state, as of the last ground update.
    #[inline]
    pub fn grounded(&self) -> bool {
        self.grounded
    }

    /// Grounded with the coyote forgiveness window applied.
    #[inline]
    pub fn grounded_within_coyote(&self) -> bool {
        self.grounded || self.air_time <= self.tuning.coyote_time
    }

    /// Seconds since last ground contact (0 while grounded).
    #[inline]
    pub fn air_time(&self) -> f32 {
        self.air_time
    }

    #[inline]
    pub fn ground(&self) -> Option<&GroundHit> {
        self.ground.as_ref()
    }

    pub fn set_velocity_override(&mut self, vector: Vec3, duration: f32, suspend_gravity: bool) {
        self.vel_override = Some(VelocityOverride {
            vector: sanitize(vector),
            remaining: duration.max(0.0),
            suspend_gravity,
        });
    }

    #[inline]
    pub fn clear_velocity_override(&mut self) {
        self.vel_override = None;
    }

    #[inline]
    pub fn has_velocity_override(&self) -> bool {
        self.vel_override.is_some()
    }

    /// Record this frame's ground probe result and update grounded windows.
    ///
    /// Hits further below the capsule base than the snap distance do not
    /// count as ground. On contact the base snaps to hover height above the
    /// surface and downward velocity is flattened; callers that need the
    /// impact speed (landing springs, slam conversion) must read it before
    /// calling this.
    pub fn update_ground(&mut self, hit: Option<GroundHit>, dt: f32) {
        let capsule = self.capsule();
        let hit = hit.filter(|h| h.clearance(self.position, capsule) <= SNAP_MAX_DISTANCE);
        self.ground = hit;
        if let Some(h) = hit {
            self.grounded = true;
            self.air_time = 0.0;
            if self.velocity.y <= 0.0 && self.vel_override.is_none() {
                self.velocity.y = 0.0;
                self.position.y = h.point.y + capsule.bottom_offset() + SNAP_HOVER_HEIGHT;
            }
        } else {
            self.grounded = false;
            self.air_time = (self.air_time + dt).min(f32::MAX);
        }
    }

    /// Integrate one step: apply override/gravity, resolve motion against the
    /// world, and commit the resulting translation and effective velocity.
    pub fn integrate(
        &mut self,
        dt: f32,
        query: &impl PhysicsQuery,
        filter: QueryFilter,
        resolver: &ResolverTuning,
    ) {
        if dt <= 0.0 {
            return;
        }
        self.velocity = sanitize(self.velocity);

        let mut suspend_gravity = false;
        if let Some(ov) = &mut self.vel_override {
            self.velocity = ov.vector;
            suspend_gravity = ov.suspend_gravity;
            ov.remaining -= dt;
            // Tolerance absorbs f32 accumulation error, so a duration that is
            // an exact multiple of dt expires on its final tick instead of
            // lingering one frame.
            if ov.remaining <= 1.0e-6 {
                self.vel_override = None;
            }
        }

        if !suspend_gravity && !self.grounded {
            self.velocity.y =
                (self.velocity.y - self.tuning.gravity * dt).max(-self.tuning.terminal_fall_speed);
        }

        // Drop sub-threshold motion entirely to avoid micro jitter.
        let step = self.velocity * dt;
        let min_move = self.params.min_move_distance;
        if step.norm_squared() <= min_move * min_move {
            return;
        }

        let capsule = self.capsule();
        let res = resolve_slide(query, capsule, self.position, self.velocity, dt, filter, resolver);

        // Step attempt for small ledges: only worthwhile when horizontal
        // motion was mostly eaten and we are on the ground.
        let desired_h = horizontal(step).norm();
        let achieved_h = horizontal(res.translation).norm();
        if self.grounded
            && self.params.step_height > 0.0
            && desired_h > 1.0e-4
            && achieved_h < desired_h * 0.5
        {
            if let Some((pos, vel)) = self.try_step_up(dt, query, filter, resolver, desired_h) {
                self.position = pos;
                self.velocity = vel;
                return;
            }
        }

        self.position += res.translation;
        self.velocity = res.effective_velocity;
    }

    /// Up, forward, down: the classic ledge step. Returns the stepped pose
    /// when it beats the direct result.
    fn try_step_up(
        &self,
        dt: f32,
        query: &impl PhysicsQuery,
        filter: QueryFilter,
        resolver: &ResolverTuning,
        direct_achieved: f32,
    ) -> Option<(Vec3, Vec3)> {
        let capsule = self.capsule();
        let step_h = self.params.step_height;
        let up_vec = Vec3::new(0.0, step_h, 0.0);

        // Up: stop short if there is a ceiling.
        let up_pos = match query.capsule_cast(self.position, capsule, up_vec, filter) {
            Some(hit) => self.position + up_vec * (hit.fraction * 0.9),
            None => self.position + up_vec,
        };

        // Forward from the raised position.
        let fwd = resolve_slide(query, capsule, up_pos, self.velocity, dt, filter, resolver);
        let fwd_pos = up_pos + fwd.translation;

        // Down: settle back by at most the step height.
        let down_vec = Vec3::new(0.0, -(step_h + 0.05), 0.0);
        let down_pos = match query.capsule_cast(fwd_pos, capsule, down_vec, filter) {
            Some(hit) => fwd_pos + down_vec * hit.fraction,
            None => fwd_pos + down_vec,
        };

        let stepped_h = horizontal(down_pos - self.position).norm();
        if stepped_h > direct_achieved + 1.0e-4 {
            Some((down_pos, fwd.effective_velocity))
        } else {
            None
        }
    }

    /// Stop everything: velocity, overrides. Grounded state is left to the
    /// next probe.
    pub fn force_stop(&mut self) {
        self.velocity = Vec3::zeros();
        self.vel_override = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{StaticBody, StaticWorld};
    use crate::ground::{GroundProbeTuning, probe_ground};

    fn flat_world() -> StaticWorld {
        StaticWorld::new(vec![StaticBody::plane(Vec3::new(0.0, 1.0, 0.0), 0.0)])
    }

    fn tick_body(body: &mut KinematicBody, world: &StaticWorld, dt: f32) {
        let hit = probe_ground(
            world,
            body.position,
            body.capsule(),
            body.velocity(),
            &GroundProbeTuning::default(),
        );
        body.update_ground(hit, dt);
        body.integrate(dt, world, QueryFilter::terrain(), &ResolverTuning::default());
    }

    #[test]
    fn falls_and_lands_on_plane() {
        let world = flat_world();
        let mut body = KinematicBody::new(Vec3::new(0.0, 5.0, 0.0), 0.4, 1.8);

        let dt = 1.0 / 120.0;
        for _ in 0..(3.0 / dt) as usize {
            tick_body(&mut body, &world, dt);
        }

        assert!(body.grounded());
        assert!(body.velocity().norm() < 0.1);
        // Resting with the capsule base at the floor (within skin tolerance).
        let base = body.position.y - body.capsule().bottom_offset();
        assert!(base.abs() < 0.05, "base {base}");
    }

    #[test]
    fn velocity_override_suspends_gravity() {
        let world = StaticWorld::empty();
        let mut body = KinematicBody::new(Vec3::new(0.0, 100.0, 0.0), 0.4, 1.8);
        body.set_velocity_override(Vec3::new(0.0, 0.0, 5.0), 0.5, true);

        let dt = 0.1;
        for _ in 0..5 {
            tick_body(&mut body, &world, dt);
        }

        // Constant horizontal drift, no vertical drop while the override held.
        assert!((body.position.y - 100.0).abs() < 1.0e-3);
        assert!((body.position.z - 2.5).abs() < 1.0e-2);

        // After expiry gravity resumes.
        tick_body(&mut body, &world, dt);
        assert!(body.velocity().y < 0.0);
        assert!(!body.has_velocity_override());
    }

    #[test]
    fn coyote_window_extends_grounded() {
        let world = flat_world();
        let mut body = KinematicBody::new(
            Vec3::new(0.0, CapsuleSpec::from_total_height(0.4, 1.8).bottom_offset() + 0.01, 0.0),
            0.4,
            1.8,
        );
        let dt = 1.0 / 120.0;
        tick_body(&mut body, &world, dt);
        assert!(body.grounded());

        // Simulate losing ground.
        body.update_ground(None, 0.05);
        assert!(!body.grounded());
        assert!(body.grounded_within_coyote());
        body.update_ground(None, 0.2);
        assert!(!body.grounded_within_coyote());
    }

    #[test]
    fn set_height_keeps_base_fixed() {
        let mut body = KinematicBody::new(Vec3::new(0.0, 0.9, 0.0), 0.4, 1.8);
        let base = body.position.y - body.height() / 2.0;

        body.set_height(0.9);
        assert!((body.position.y - body.height() / 2.0 - base).abs() < 1.0e-6);

        body.set_height(1.8);
        assert!((body.position.y - body.height() / 2.0 - base).abs() < 1.0e-6);
    }

    #[test]
    fn jump_cut_only_touches_upward_motion() {
        let mut body = KinematicBody::new(Vec3::zeros(), 0.4, 1.8);
        body.set_velocity(Vec3::new(2.0, 8.0, 0.0));
        body.cut_vertical(0.5);
        assert_eq!(body.velocity().y, 4.0);

        body.set_velocity(Vec3::new(2.0, -8.0, 0.0));
        body.cut_vertical(0.5);
        assert_eq!(body.velocity().y, -8.0);
    }
}
