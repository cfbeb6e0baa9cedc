/*!
Core collision types and math aliases shared by the collision submodules.

This module intentionally contains no algorithms. It defines the data types
exchanged between:
- broad (static world acceleration structures and candidate queries)
- narrow_phase (parry3d time-of-impact and ray queries)
- world (the injectable physics-query service)
- resolver (collide-and-slide)
- ground probing and the locomotion layers above
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// Collision layer bitmask. Each static body belongs to exactly one layer bit;
/// query filters accept any subset.
pub type LayerMask = u32;

/// Walkable world geometry (terrain, ramps, floors).
pub const LAYER_TERRAIN: LayerMask = 1 << 0;
/// Movable props and clutter; probed only by relaxed fallback queries.
pub const LAYER_PROPS: LayerMask = 1 << 1;
/// Everything.
pub const LAYER_ALL: LayerMask = !0;

/// A rigid transform (isometry) in world space.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::identity(),
        }
    }

    /// Convert to nalgebra `Isometry3` for use with parry3d narrow-phase queries.
    #[inline]
    pub fn iso(&self) -> Iso {
        Iso::from_parts(
            na::Translation3::new(self.translation.x, self.translation.y, self.translation.z),
            self.rotation,
        )
    }
}

/// Static collision shapes supported by the world.
///
/// - Plane: infinite plane in world-space represented by its normal and offset (dist)
///          satisfying: normal ⋅ x = dist.
/// - Cuboid: oriented box with half-extents in local space, placed by `transform`.
#[derive(Clone, Copy, Debug)]
pub enum StaticShape {
    Plane {
        /// World-space unit normal of the plane.
        normal: Vec3,
        /// Plane offset along the normal, i.e., normal ⋅ x = dist.
        dist: f32,
    },
    Cuboid {
        /// Local-space half-extents (hx, hy, hz).
        half_extents: Vec3,
        /// World-space pose of the cuboid.
        transform: Transform,
    },
    Sphere {
        /// Radius of the sphere in meters.
        radius: f32,
        /// World-space pose (translation used; rotation ignored).
        transform: Transform,
    },
    Capsule {
        /// Radius of the spherical caps and cylinder.
        radius: f32,
        /// Half of the cylinder length along the local +Y axis.
        half_height: f32,
        /// World-space pose of the capsule.
        transform: Transform,
    },
}

/// A static shape together with its query metadata.
///
/// Triggers are volumes that report overlap to gameplay but never block motion;
/// solid queries skip them unless the filter opts in.
#[derive(Clone, Copy, Debug)]
pub struct StaticBody {
    pub shape: StaticShape,
    pub layer: LayerMask,
    pub is_trigger: bool,
}

impl StaticBody {
    #[inline]
    pub fn new(shape: StaticShape) -> Self {
        Self {
            shape,
            layer: LAYER_TERRAIN,
            is_trigger: false,
        }
    }

    /// Infinite plane from a world-space normal and offset along it.
    #[inline]
    pub fn plane(normal: Vec3, dist: f32) -> Self {
        Self::new(StaticShape::Plane { normal, dist })
    }

    /// Axis-aligned or oriented box from half extents and pose.
    #[inline]
    pub fn cuboid(half_extents: Vec3, translation: Vec3, rotation: Quat) -> Self {
        Self::new(StaticShape::Cuboid {
            half_extents,
            transform: Transform::new(translation, rotation),
        })
    }

    #[inline]
    pub fn sphere(radius: f32, translation: Vec3) -> Self {
        Self::new(StaticShape::Sphere {
            radius,
            transform: Transform::from_translation(translation),
        })
    }

    #[inline]
    pub fn capsule(radius: f32, half_height: f32, translation: Vec3) -> Self {
        Self::new(StaticShape::Capsule {
            radius,
            half_height,
            transform: Transform::from_translation(translation),
        })
    }

    #[inline]
    pub fn with_layer(mut self, layer: LayerMask) -> Self {
        self.layer = layer;
        self
    }

    #[inline]
    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}

/// Filter applied to every physics query.
#[derive(Clone, Copy, Debug)]
pub struct QueryFilter {
    /// Layers the query may hit.
    pub layer_mask: LayerMask,
    /// Whether trigger volumes count as hits.
    pub include_triggers: bool,
}

impl QueryFilter {
    /// Default solid-world filter: terrain only, no triggers.
    #[inline]
    pub fn terrain() -> Self {
        Self {
            layer_mask: LAYER_TERRAIN,
            include_triggers: false,
        }
    }

    /// Fully relaxed filter used by last-resort ground-probe fallbacks:
    /// every layer, triggers included.
    #[inline]
    pub fn permissive() -> Self {
        Self {
            layer_mask: LAYER_ALL,
            include_triggers: true,
        }
    }

    /// True if a body passes this filter.
    #[inline]
    pub fn accepts(&self, body: &StaticBody) -> bool {
        (body.layer & self.layer_mask) != 0 && (self.include_triggers || !body.is_trigger)
    }
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::terrain()
    }
}

/// Capsule specification for kinematic actors.
///
/// half_height is the half-length of the cylinder section (aligned with +Y),
/// so the total capsule height is 2*half_height + 2*radius.
#[derive(Clone, Copy, Debug)]
pub struct CapsuleSpec {
    pub radius: f32,
    pub half_height: f32,
}

impl CapsuleSpec {
    #[inline]
    pub fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius,
            half_height,
        }
    }

    /// Build from a total height (caps included), clamping degenerate inputs.
    #[inline]
    pub fn from_total_height(radius: f32, total_height: f32) -> Self {
        let half_height = (total_height * 0.5 - radius).max(0.0);
        Self {
            radius,
            half_height,
        }
    }

    /// Total capsule height including both caps.
    #[inline]
    pub fn total_height(&self) -> f32 {
        2.0 * (self.half_height + self.radius)
    }

    /// Distance from the capsule center down to its lowest point.
    #[inline]
    pub fn bottom_offset(&self) -> f32 {
        self.half_height + self.radius
    }
}

/// A single contact result returned by a time-of-impact (TOI) query
/// used during sweep-and-slide or ground probing.
#[derive(Clone, Copy, Debug)]
pub struct SweepHit {
    /// World-space contact normal on the moving shape, opposing the motion.
    pub normal: Vec3,
    /// Fraction (0..1) of the tested translation where the hit occurred.
    pub fraction: f32,
}

/// A ray intersection against world geometry.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    /// World-space surface normal at the intersection.
    pub normal: Vec3,
    /// Distance from the ray origin along its direction.
    pub distance: f32,
    /// World-space intersection point.
    pub point: Vec3,
}
