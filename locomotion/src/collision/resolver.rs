/*!
Collide-and-slide resolver.

Sweeps a capsule along a desired velocity, splitting the motion into a safe
translation plus a velocity re-projected onto any obstruction, iterated a
bounded number of times per frame. The re-projected velocity is rescaled to
retain most of its pre-projection speed so that glancing wall contact does not
silently bleed momentum.

Only walls take the projection branch. Surfaces whose normal is within
[`MIN_WALL_ANGLE_DEG`] of vertical are floors or ceilings; the sweep stops at
contact and leaves the leftover to gravity or the caller.
*/

use crate::collision::{
    settings::{
        DEFAULT_RESOLVER_BUDGET, DEFAULT_SKIN, MIN_MOVE_SQ, MIN_WALL_ANGLE_DEG,
        SLIDE_SPEED_RETENTION,
    },
    types::{CapsuleSpec, QueryFilter, Vec3},
    world::PhysicsQuery,
};
use crate::utils::{normalize_or_zero, sanitize};

/// Tunables for a slide resolution pass.
#[derive(Clone, Copy, Debug)]
pub struct ResolverTuning {
    /// Iteration budget; at exhaustion the entity stops instead of tunneling.
    pub max_iterations: u32,
    /// Minimum angle between a surface normal and vertical for the surface to
    /// count as a wall (degrees).
    pub min_wall_angle_deg: f32,
    /// Fraction of pre-projection speed retained after plane projection.
    pub speed_retention: f32,
    /// Separation kept from surfaces (meters).
    pub skin: f32,
}

impl Default for ResolverTuning {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_RESOLVER_BUDGET,
            min_wall_angle_deg: MIN_WALL_ANGLE_DEG,
            speed_retention: SLIDE_SPEED_RETENTION,
            skin: DEFAULT_SKIN,
        }
    }
}

/// Result of one resolution pass.
#[derive(Clone, Copy, Debug)]
pub struct SlideResolution {
    /// Effective velocity for this frame: summed safe translation divided by dt.
    /// Zero when the iteration budget was exhausted.
    pub effective_velocity: Vec3,
    /// Summed safe translation actually performed.
    pub translation: Vec3,
    /// Iterations consumed (0 means the path was clear).
    pub iterations_used: u32,
    /// True when the budget ran out before the motion resolved.
    pub exhausted: bool,
}

/// Resolve `velocity` against world geometry from `start` over `dt` seconds.
///
/// Each iteration sweeps the capsule along the current velocity, advances to
/// just before contact (minus skin), and on a wall hit re-projects the
/// leftover velocity onto the obstruction plane, rescaled to
/// `tuning.speed_retention` of its pre-projection speed. Floors and ceilings
/// end the pass at contact.
pub fn resolve_slide(
    query: &impl PhysicsQuery,
    capsule: CapsuleSpec,
    start: Vec3,
    velocity: Vec3,
    dt: f32,
    filter: QueryFilter,
    tuning: &ResolverTuning,
) -> SlideResolution {
    let mut pos = start;
    let mut vel = sanitize(velocity);
    let mut total = Vec3::zeros();
    let mut iterations_used = 0;
    let mut exhausted = false;

    if dt <= 0.0 {
        return SlideResolution {
            effective_velocity: Vec3::zeros(),
            translation: Vec3::zeros(),
            iterations_used: 0,
            exhausted: false,
        };
    }

    let wall_cos = tuning.min_wall_angle_deg.to_radians().cos();

    loop {
        let dist = vel.norm() * dt;
        if dist * dist <= MIN_MOVE_SQ {
            break;
        }

        if iterations_used >= tuning.max_iterations {
            // Budget exhausted: stop dead rather than risk tunneling.
            exhausted = true;
            vel = Vec3::zeros();
            break;
        }
        iterations_used += 1;

        let dir = vel / vel.norm();
        let step = dir * dist;

        let Some(hit) = query.capsule_cast(pos, capsule, step, filter) else {
            // Clear path: take the whole step and finish.
            pos += step;
            total += step;
            break;
        };

        // Travel up to the contact point (minus skin).
        let travel = (dist * hit.fraction - tuning.skin).max(0.0);
        let advance = dir * travel;
        pos += advance;
        total += advance;

        let n = normalize_or_zero(sanitize(hit.normal));
        if n == Vec3::zeros() {
            // Degenerate normal: stop here rather than propagate garbage.
            vel = Vec3::zeros();
            break;
        }

        // Floors and ceilings do not slide; the sweep ends at contact.
        if n.y.abs() > wall_cos {
            vel = Vec3::zeros();
            break;
        }

        // Leftover motion, re-projected onto the wall plane and rescaled to
        // preserve most of its speed.
        let leftover_dist = (dist - travel).max(0.0);
        let leftover_vel = dir * (leftover_dist / dt);
        let projected = leftover_vel - n * leftover_vel.dot(&n);
        // Near-head-on hits leave only numerical noise in the plane; the
        // rescale below would blow that noise up to near-full speed in an
        // arbitrary direction. Anything under 1% tangential is a stop.
        if projected.norm_squared() <= leftover_vel.norm_squared() * 1.0e-4 {
            vel = Vec3::zeros();
            break;
        }

        vel = normalize_or_zero(projected) * (leftover_vel.norm() * tuning.speed_retention);
    }

    let effective_velocity = if exhausted { Vec3::zeros() } else { total / dt };

    SlideResolution {
        effective_velocity,
        translation: total,
        iterations_used,
        exhausted,
    }
}
