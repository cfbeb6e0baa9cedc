/*!
Collision and resolver tolerances.

These constants centralize the parameters used by the collide-and-slide
resolver and ground probing. Keeping them together makes tuning easier and
helps ensure deterministic behavior across platforms.

Notes
- Distances are in meters, time in seconds, angles in degrees unless noted.
- Favor practical world-space tolerances over machine epsilon for robust behavior.
*/

/// Separation kept from surfaces when stopping a sweep (meters).
/// Too large creates visible gaps; too small risks jitter on contact.
pub const DEFAULT_SKIN: f32 = 0.02;

/// Default iteration budget for the collide-and-slide resolver.
/// Higher values help with tight corners at the cost of more queries.
pub const DEFAULT_RESOLVER_BUDGET: u32 = 3;

/// Minimum squared movement threshold to consider a step meaningful (m^2).
/// Movements below this are treated as zero to avoid tiny oscillations.
pub const MIN_MOVE_SQ: f32 = 1.0e-8;

/// Minimum angle between a surface normal and the vertical axis for the
/// surface to count as a wall during slide resolution (degrees).
/// Below this the surface is a floor or ceiling and the sweep simply stops.
pub const MIN_WALL_ANGLE_DEG: f32 = 45.0;

/// Fraction of pre-projection speed retained when a blocked velocity is
/// re-projected onto an obstruction plane. Plain plane projection bleeds
/// speed on glancing hits; rescaling keeps motion feeling continuous.
pub const SLIDE_SPEED_RETENTION: f32 = 0.95;

/// Gravity magnitude in meters per second squared (positive value).
/// Deliberately above 9.81 for responsive, weighty falls.
pub const GRAVITY_MPS2: f32 = 20.0;

/// Hover height kept above detected ground along the surface normal (meters).
/// Prevents exact contact, which reduces jitter and depenetration needs.
pub const SNAP_HOVER_HEIGHT: f32 = 0.02;

/// Max downward snap distance used when latching onto ground (meters).
pub const SNAP_MAX_DISTANCE: f32 = 0.30;
