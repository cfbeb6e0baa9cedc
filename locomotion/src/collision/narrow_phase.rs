use nalgebra as na;
use parry3d::{
    query::{self, Ray, RayCast, ShapeCastOptions},
    shape as pshape,
};

use super::types::{Iso, RayHit, StaticShape, SweepHit, Vec3};

/// Cast a moving shape against a single static shape and return the earliest hit (if any).
///
/// - `moving_iso`: the moving shape's starting isometry in world space.
/// - `moving`: the shape being swept (capsule or sphere).
/// - `vel`: the world-space translation vector for this cast (units: meters).
/// - `max_toi`: the maximum fraction of `vel` to consider (typically 1.0).
/// - `shape`: the static shape to test against.
///
/// Returns the impact normal (on the moving shape, flipped to oppose the motion)
/// and the fraction along `vel` where the hit occurs.
pub fn cast_shape_against_static(
    moving_iso: Iso,
    moving: &dyn pshape::Shape,
    vel: Vec3,
    max_toi: f32,
    shape: &StaticShape,
) -> Option<SweepHit> {
    match *shape {
        StaticShape::Plane { normal, dist } => {
            // Plane: represent as a parry HalfSpace with world normal, positioned at normal * dist.
            // Plane equation in world space: normal ⋅ x = dist
            let unit_n = na::Unit::new_normalize(normal);
            let plane = pshape::HalfSpace { normal: unit_n };
            cast_against(moving_iso, moving, vel, max_toi, plane_iso(normal, dist), &plane)
        }
        StaticShape::Cuboid {
            half_extents,
            transform,
        } => {
            let cuboid = pshape::Cuboid::new(half_extents);
            cast_against(moving_iso, moving, vel, max_toi, transform.iso(), &cuboid)
        }
        StaticShape::Sphere { radius, transform } => {
            let ball = pshape::Ball::new(radius);
            cast_against(moving_iso, moving, vel, max_toi, transform.iso(), &ball)
        }
        StaticShape::Capsule {
            radius,
            half_height,
            transform,
        } => {
            let static_capsule = pshape::Capsule::new_y(half_height, radius);
            cast_against(
                moving_iso,
                moving,
                vel,
                max_toi,
                transform.iso(),
                &static_capsule,
            )
        }
    }
}

/// Cast a ray against a single static shape.
///
/// `dir` must be unit length; `max_dist` bounds the search along it.
pub fn ray_against_static(
    origin: Vec3,
    dir: Vec3,
    max_dist: f32,
    shape: &StaticShape,
) -> Option<RayHit> {
    let ray = Ray::new(na::Point3::new(origin.x, origin.y, origin.z), dir);

    let hit = match *shape {
        StaticShape::Plane { normal, dist } => {
            let unit_n = na::Unit::new_normalize(normal);
            let plane = pshape::HalfSpace { normal: unit_n };
            plane.cast_ray_and_get_normal(&plane_iso(normal, dist), &ray, max_dist, true)
        }
        StaticShape::Cuboid {
            half_extents,
            transform,
        } => pshape::Cuboid::new(half_extents).cast_ray_and_get_normal(
            &transform.iso(),
            &ray,
            max_dist,
            true,
        ),
        StaticShape::Sphere { radius, transform } => pshape::Ball::new(radius)
            .cast_ray_and_get_normal(&transform.iso(), &ray, max_dist, true),
        StaticShape::Capsule {
            radius,
            half_height,
            transform,
        } => pshape::Capsule::new_y(half_height, radius).cast_ray_and_get_normal(
            &transform.iso(),
            &ray,
            max_dist,
            true,
        ),
    };

    hit.map(|h| {
        let distance = h.time_of_impact;
        RayHit {
            normal: Vec3::new(h.normal.x, h.normal.y, h.normal.z),
            distance,
            point: origin + dir * distance,
        }
    })
}

/// Shared shape-cast wrapper: run parry's TOI query and normalize the result.
fn cast_against(
    moving_iso: Iso,
    moving: &dyn pshape::Shape,
    vel: Vec3,
    max_toi: f32,
    static_iso: Iso,
    static_shape: &dyn pshape::Shape,
) -> Option<SweepHit> {
    let mut opts = ShapeCastOptions::with_max_time_of_impact(max_toi);
    opts.stop_at_penetration = true;

    if let Ok(Some(hit)) = query::cast_shapes(
        &moving_iso,
        &vel,
        moving,
        &static_iso,
        &na::Vector3::zeros(),
        static_shape,
        opts,
    ) {
        // Use the normal on the moving shape; ensure it opposes the motion.
        let mut n = Vec3::new(
            hit.normal1.into_inner().x,
            hit.normal1.into_inner().y,
            hit.normal1.into_inner().z,
        );
        if n.dot(&vel) > 0.0 {
            n = -n;
        }
        return Some(SweepHit {
            normal: n,
            fraction: hit.time_of_impact,
        });
    }
    None
}

/// Isometry placing a parry `HalfSpace` so it matches `normal ⋅ x = dist`.
#[inline]
fn plane_iso(normal: Vec3, dist: f32) -> Iso {
    let p = normal * dist;
    Iso::from_parts(
        na::Translation3::new(p.x, p.y, p.z),
        na::UnitQuaternion::identity(),
    )
}
