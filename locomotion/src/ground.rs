/*!
Ground probing with layered fallbacks.

A single probe strategy misses thin or irregular geometry, so the probe runs a
ladder of queries, cheapest and most precise first:

1. A slightly shrunk sphere swept down from just above the capsule's bottom,
   over a distance proportional to the capsule height.
2. A straight ray from the same origin.
3. A ray from the capsule center (the entity root).
4. Several offset sample rays around the base, with a fully relaxed filter.

The first hit wins. Slope angle is the angle between world up and the surface
normal. When the reported normal is suspiciously flat despite clearly
descending motion, an optional heuristic infers the slope from the velocity
instead; it is a tunable workaround for backends with unreliable normals, not
a correctness guarantee.
*/

use crate::collision::{
    CapsuleSpec, PhysicsQuery, QueryFilter, Vec3,
    settings::SNAP_HOVER_HEIGHT,
};
use crate::utils::{self, normalize_or_zero, sanitize, slope_angle_deg, up};

/// Result of a successful ground probe.
#[derive(Clone, Copy, Debug)]
pub struct GroundHit {
    /// World-space contact point.
    pub point: Vec3,
    /// World-space surface normal (unit, upward-facing).
    pub normal: Vec3,
    /// Angle between world up and the normal, degrees.
    pub slope_deg: f32,
}

impl GroundHit {
    /// Distance from the capsule's lowest point to the contact, along -Y.
    #[inline]
    pub fn clearance(&self, position: Vec3, capsule: CapsuleSpec) -> f32 {
        (position.y - capsule.bottom_offset()) - self.point.y
    }
}

/// Probe tunables.
#[derive(Clone, Copy, Debug)]
pub struct GroundProbeTuning {
    /// Probe reach as a fraction of total capsule height.
    pub reach_factor: f32,
    /// Sphere shrink factor relative to the capsule radius.
    pub shrink_factor: f32,
    /// Filter for the primary probe layers.
    pub filter: QueryFilter,
    /// Enable the flat-but-descending slope inference workaround.
    pub infer_slope_from_velocity: bool,
    /// Minimum downward speed before the inference may fire (m/s). Kept well
    /// above landing residue so ordinary touchdowns do not trip it.
    pub min_descend_speed: f32,
    /// Normals flatter than this (degrees) are candidates for inference.
    pub flat_normal_deg: f32,
}

impl Default for GroundProbeTuning {
    fn default() -> Self {
        Self {
            reach_factor: 0.35,
            shrink_factor: 0.9,
            filter: QueryFilter::terrain(),
            infer_slope_from_velocity: true,
            min_descend_speed: 2.0,
            flat_normal_deg: 2.0,
        }
    }
}

/// Query the nearest walkable surface beneath a capsule at `position`.
///
/// `velocity` feeds the flat-but-descending heuristic only; pass zeros to
/// disable it for a single call.
pub fn probe_ground(
    query: &impl PhysicsQuery,
    position: Vec3,
    capsule: CapsuleSpec,
    velocity: Vec3,
    tuning: &GroundProbeTuning,
) -> Option<GroundHit> {
    let reach = (capsule.total_height() * tuning.reach_factor).max(SNAP_HOVER_HEIGHT * 2.0);
    let down = -up();

    let shrunk_radius = capsule.radius * tuning.shrink_factor.clamp(0.1, 1.0);
    // Sphere center just above the capsule's bottom sphere.
    let origin = position + down * (capsule.half_height - SNAP_HOVER_HEIGHT);

    // 1) Shrunk sphere sweep.
    if let Some(hit) = query.sphere_cast(origin, shrunk_radius, down * reach, tuning.filter) {
        let impact_center = origin + down * (reach * hit.fraction);
        let normal = upward(hit.normal);
        let ground = GroundHit {
            point: impact_center + down * shrunk_radius,
            normal,
            slope_deg: slope_angle_deg(normal),
        };
        return Some(correct_flat_descending(ground, velocity, tuning));
    }

    // 2) Ray from the sphere origin, reaching to where the sweep would have.
    let ray_reach = reach + shrunk_radius;
    if let Some(hit) = query.ray_cast(origin, down, ray_reach, tuning.filter) {
        return Some(ray_ground(hit.point, hit.normal, velocity, tuning));
    }

    // 3) Ray from the entity root (capsule center).
    let root_reach = capsule.bottom_offset() + reach;
    if let Some(hit) = query.ray_cast(position, down, root_reach, tuning.filter) {
        return Some(ray_ground(hit.point, hit.normal, velocity, tuning));
    }

    // 4) Offset samples around the base, relaxed filter. Thin ledges and
    // irregular geometry directly under the center are the common miss case.
    let r = capsule.radius * 0.5;
    let offsets = [
        Vec3::new(r, 0.0, 0.0),
        Vec3::new(-r, 0.0, 0.0),
        Vec3::new(0.0, 0.0, r),
        Vec3::new(0.0, 0.0, -r),
    ];
    let mut best: Option<crate::collision::RayHit> = None;
    for offset in offsets {
        if let Some(hit) =
            query.ray_cast(position + offset, down, root_reach, QueryFilter::permissive())
        {
            if best.map_or(true, |b| hit.distance < b.distance) {
                best = Some(hit);
            }
        }
    }
    if let Some(hit) = best {
        log::trace!("ground probe fell back to offset samples");
        return Some(ray_ground(hit.point, hit.normal, velocity, tuning));
    }

    None
}

fn ray_ground(
    point: Vec3,
    normal: Vec3,
    velocity: Vec3,
    tuning: &GroundProbeTuning,
) -> GroundHit {
    let normal = upward(normal);
    let ground = GroundHit {
        point,
        normal,
        slope_deg: slope_angle_deg(normal),
    };
    correct_flat_descending(ground, velocity, tuning)
}

/// Flip a normal so it faces up, normalizing degenerate input away.
fn upward(normal: Vec3) -> Vec3 {
    let n = normalize_or_zero(sanitize(normal));
    if n == Vec3::zeros() {
        up()
    } else if n.y < 0.0 {
        -n
    } else {
        n
    }
}

/// "Flat but clearly descending" correction: when the normal says flat but
/// the entity is moving distinctly downward, infer a slope from the motion.
fn correct_flat_descending(
    ground: GroundHit,
    velocity: Vec3,
    tuning: &GroundProbeTuning,
) -> GroundHit {
    if !tuning.infer_slope_from_velocity {
        return ground;
    }
    if ground.slope_deg > tuning.flat_normal_deg {
        return ground;
    }
    if velocity.y >= -tuning.min_descend_speed {
        return ground;
    }
    let horiz = utils::horizontal(velocity).norm();
    if horiz <= 1.0e-3 {
        // Straight falls carry no slope information.
        return ground;
    }

    let dir = normalize_or_zero(velocity);
    // Normal perpendicular to the motion, within its vertical plane.
    let inferred = normalize_or_zero(up() - dir * dir.y);
    if inferred == Vec3::zeros() {
        return ground;
    }

    let slope_deg = slope_angle_deg(inferred);
    log::trace!("flat normal with descending motion, inferring slope {slope_deg:.1} deg");
    GroundHit {
        point: ground.point,
        normal: inferred,
        slope_deg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Quat, StaticBody, StaticWorld};

    fn capsule() -> CapsuleSpec {
        CapsuleSpec::new(0.4, 0.5)
    }

    fn tuning() -> GroundProbeTuning {
        GroundProbeTuning::default()
    }

    #[test]
    fn flat_plane_reports_zero_slope() {
        let world = StaticWorld::new(vec![StaticBody::plane(Vec3::new(0.0, 1.0, 0.0), 0.0)]);
        let pos = Vec3::new(0.0, capsule().bottom_offset() + 0.01, 0.0);

        let hit = probe_ground(&world, pos, capsule(), Vec3::zeros(), &tuning())
            .expect("flat ground under feet");
        assert!(hit.slope_deg < 0.5);
        assert!(hit.normal.y > 0.99);
        assert!(hit.point.y.abs() < 0.1);
    }

    #[test]
    fn tilted_plane_reports_slope_angle() {
        let deg = 30.0_f32.to_radians();
        let normal = Vec3::new(deg.sin(), deg.cos(), 0.0);
        let world = StaticWorld::new(vec![StaticBody::plane(normal, 0.0)]);
        let pos = Vec3::new(0.0, capsule().bottom_offset() + 0.01, 0.0);

        let hit = probe_ground(&world, pos, capsule(), Vec3::zeros(), &tuning())
            .expect("slope under feet");
        assert!((hit.slope_deg - 30.0).abs() < 1.0);
    }

    #[test]
    fn airborne_probe_misses() {
        let world = StaticWorld::new(vec![StaticBody::plane(Vec3::new(0.0, 1.0, 0.0), 0.0)]);
        let pos = Vec3::new(0.0, 50.0, 0.0);
        assert!(probe_ground(&world, pos, capsule(), Vec3::zeros(), &tuning()).is_none());
    }

    #[test]
    fn offset_fallback_finds_props_layer() {
        // Geometry only on the props layer: the primary filter misses it, the
        // relaxed offset samples find it.
        let world = StaticWorld::new(vec![
            StaticBody::cuboid(
                Vec3::new(5.0, 0.5, 5.0),
                Vec3::new(0.0, -0.5, 0.0),
                Quat::identity(),
            )
            .with_layer(crate::collision::LAYER_PROPS),
        ]);
        let pos = Vec3::new(0.0, capsule().bottom_offset() + 0.01, 0.0);

        let hit = probe_ground(&world, pos, capsule(), Vec3::zeros(), &tuning())
            .expect("relaxed fallback should find the box");
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn flat_descending_heuristic_fires_and_respects_gate() {
        let world = StaticWorld::new(vec![StaticBody::plane(Vec3::new(0.0, 1.0, 0.0), 0.0)]);
        let pos = Vec3::new(0.0, capsule().bottom_offset() + 0.01, 0.0);

        // Fast diagonal descent on a flat normal: slope inferred from motion.
        let v = Vec3::new(6.0, -6.0, 0.0);
        let hit = probe_ground(&world, pos, capsule(), v, &tuning()).unwrap();
        assert!((hit.slope_deg - 45.0).abs() < 1.0);

        // Residual landing velocity stays below the gate: no inference.
        let v = Vec3::new(6.0, -1.0, 0.0);
        let hit = probe_ground(&world, pos, capsule(), v, &tuning()).unwrap();
        assert!(hit.slope_deg < 0.5);

        // Heuristic disabled entirely.
        let mut t = tuning();
        t.infer_slope_from_velocity = false;
        let hit = probe_ground(&world, pos, capsule(), Vec3::new(6.0, -6.0, 0.0), &t).unwrap();
        assert!(hit.slope_deg < 0.5);
    }
}
