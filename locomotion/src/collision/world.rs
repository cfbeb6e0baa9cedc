/*!
The physics-query service consumed by the locomotion core.

[`PhysicsQuery`] is the injected interface: everything above the collision
layer (ground probe, resolver, controller) is written against it, so any
compliant collision backend can stand in. [`StaticWorld`] is the built-in
implementation over a set of immutable statics, broad-phase accelerated.
*/

use nalgebra as na;
use parry3d::shape as pshape;

use super::{
    broad::{self, WorldAccel},
    narrow_phase,
    types::{CapsuleSpec, Iso, QueryFilter, RayHit, StaticBody, SweepHit, Vec3},
};

/// Shape-cast and ray queries against world geometry.
///
/// All casts take the full desired translation and report hits as a fraction
/// of it; filters exclude layers and trigger volumes.
pub trait PhysicsQuery {
    /// Sweep a Y-aligned capsule centered at `pos` along `translation`.
    fn capsule_cast(
        &self,
        pos: Vec3,
        capsule: CapsuleSpec,
        translation: Vec3,
        filter: QueryFilter,
    ) -> Option<SweepHit>;

    /// Sweep a sphere centered at `center` along `translation`.
    fn sphere_cast(
        &self,
        center: Vec3,
        radius: f32,
        translation: Vec3,
        filter: QueryFilter,
    ) -> Option<SweepHit>;

    /// Cast a ray from `origin` along unit `dir`, up to `max_dist`.
    fn ray_cast(&self, origin: Vec3, dir: Vec3, max_dist: f32, filter: QueryFilter)
    -> Option<RayHit>;
}

/// Immutable static world: bodies plus a broad-phase accelerator.
pub struct StaticWorld {
    bodies: Vec<StaticBody>,
    accel: WorldAccel,
}

impl StaticWorld {
    pub fn new(bodies: Vec<StaticBody>) -> Self {
        let accel = broad::build_world_accel(&bodies);
        Self { bodies, accel }
    }

    /// Empty world; every query misses.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    #[inline]
    pub fn bodies(&self) -> &[StaticBody] {
        &self.bodies
    }

    /// Earliest hit of a moving shape against planes + broad-phase candidates.
    fn sweep(
        &self,
        moving_iso: Iso,
        moving: &dyn pshape::Shape,
        translation: Vec3,
        swept: parry3d::bounding_volume::Aabb,
        filter: QueryFilter,
    ) -> Option<SweepHit> {
        let mut best: Option<SweepHit> = None;

        // Planes are infinite and never in the accelerator; always test them.
        for &idx in &self.accel.plane_indices {
            let body = &self.bodies[idx];
            if !filter.accepts(body) {
                continue;
            }
            if let Some(hit) = narrow_phase::cast_shape_against_static(
                moving_iso,
                moving,
                translation,
                1.0,
                &body.shape,
            ) {
                if best.map_or(true, |b| hit.fraction < b.fraction) {
                    best = Some(hit);
                }
            }
        }

        for idx in broad::query_candidates(&self.accel, &swept) {
            let body = &self.bodies[idx];
            if !filter.accepts(body) {
                continue;
            }
            if let Some(hit) = narrow_phase::cast_shape_against_static(
                moving_iso,
                moving,
                translation,
                1.0,
                &body.shape,
            ) {
                if best.map_or(true, |b| hit.fraction < b.fraction) {
                    best = Some(hit);
                }
            }
        }

        best
    }
}

impl PhysicsQuery for StaticWorld {
    fn capsule_cast(
        &self,
        pos: Vec3,
        capsule: CapsuleSpec,
        translation: Vec3,
        filter: QueryFilter,
    ) -> Option<SweepHit> {
        let shape = pshape::Capsule::new_y(capsule.half_height, capsule.radius);
        let iso = translation_iso(pos);
        let swept =
            broad::swept_capsule_aabb(capsule.half_height, capsule.radius, pos, translation, 0.0);
        self.sweep(iso, &shape, translation, swept, filter)
    }

    fn sphere_cast(
        &self,
        center: Vec3,
        radius: f32,
        translation: Vec3,
        filter: QueryFilter,
    ) -> Option<SweepHit> {
        let shape = pshape::Ball::new(radius);
        let iso = translation_iso(center);
        // A sphere is a capsule with zero cylinder length for AABB purposes.
        let swept = broad::swept_capsule_aabb(0.0, radius, center, translation, 0.0);
        self.sweep(iso, &shape, translation, swept, filter)
    }

    fn ray_cast(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_dist: f32,
        filter: QueryFilter,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;

        // Rays are cheap; test every accepted body directly.
        for body in &self.bodies {
            if !filter.accepts(body) {
                continue;
            }
            if let Some(hit) = narrow_phase::ray_against_static(origin, dir, max_dist, &body.shape)
            {
                if best.map_or(true, |b| hit.distance < b.distance) {
                    best = Some(hit);
                }
            }
        }

        best
    }
}

#[inline]
fn translation_iso(pos: Vec3) -> Iso {
    Iso::from_parts(
        na::Translation3::new(pos.x, pos.y, pos.z),
        na::UnitQuaternion::identity(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::types::{LAYER_PROPS, Quat};

    fn flat_world() -> StaticWorld {
        StaticWorld::new(vec![StaticBody::plane(Vec3::new(0.0, 1.0, 0.0), 0.0)])
    }

    #[test]
    fn capsule_cast_hits_ground_plane() {
        let world = flat_world();
        let capsule = CapsuleSpec::new(0.4, 0.5);

        let hit = world
            .capsule_cast(
                Vec3::new(0.0, 5.0, 0.0),
                capsule,
                Vec3::new(0.0, -10.0, 0.0),
                QueryFilter::terrain(),
            )
            .expect("plane below should be hit");

        // The capsule's lowest point is 0.9 below center; contact at y=0 means
        // a fall of 5.0 - 0.9 = 4.1 meters, i.e. fraction 0.41.
        assert!((hit.fraction - 0.41).abs() < 1.0e-3);
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn ray_cast_reports_point_and_distance() {
        let world = flat_world();
        let hit = world
            .ray_cast(
                Vec3::new(1.0, 2.0, -3.0),
                Vec3::new(0.0, -1.0, 0.0),
                10.0,
                QueryFilter::terrain(),
            )
            .expect("ray should reach the plane");

        assert!((hit.distance - 2.0).abs() < 1.0e-4);
        assert!((hit.point.y).abs() < 1.0e-4);
        assert!((hit.point.x - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn filter_excludes_layers_and_triggers() {
        let world = StaticWorld::new(vec![
            StaticBody::cuboid(
                Vec3::new(5.0, 0.5, 5.0),
                Vec3::new(0.0, -0.5, 0.0),
                Quat::identity(),
            )
            .with_layer(LAYER_PROPS),
            StaticBody::plane(Vec3::new(0.0, 1.0, 0.0), -5.0).trigger(),
        ]);

        let down = Vec3::new(0.0, -1.0, 0.0);
        assert!(
            world
                .ray_cast(Vec3::new(0.0, 2.0, 0.0), down, 20.0, QueryFilter::terrain())
                .is_none()
        );

        // Permissive filter sees both the props layer and the trigger.
        let hit = world
            .ray_cast(Vec3::new(0.0, 2.0, 0.0), down, 20.0, QueryFilter::permissive())
            .expect("permissive filter should hit the props box");
        assert!((hit.distance - 2.0).abs() < 1.0e-3);
    }
}
