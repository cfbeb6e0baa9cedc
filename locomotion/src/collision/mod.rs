/*!
Collision root module.

This module re-exports submodules that implement the collision layer of the
locomotion core, using parry3d for narrow-phase queries and a BVH broad phase
for static world acceleration. The code is split for clarity:

- types:        shared data types (Transform, StaticBody, CapsuleSpec, filters, etc.)
- settings:     collision and resolver tolerance constants
- broad:        broad-phase helpers (swept AABBs, candidate queries)
- narrow_phase: thin wrappers over parry3d queries (TOI, rays)
- world:        the injectable `PhysicsQuery` service and its static-world impl
- resolver:     collide-and-slide resolution
*/

pub mod broad;
pub mod narrow_phase;
pub mod resolver;
pub mod settings;
pub mod types;
pub mod world;

// Re-export commonly used types and functions.
pub use resolver::{ResolverTuning, SlideResolution, resolve_slide};
pub use types::{
    CapsuleSpec, LAYER_ALL, LAYER_PROPS, LAYER_TERRAIN, LayerMask, Quat, QueryFilter, RayHit,
    StaticBody, StaticShape, SweepHit, Transform, Vec3,
};
pub use world::{PhysicsQuery, StaticWorld};
