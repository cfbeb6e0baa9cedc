//! Small math helpers shared across the locomotion modules.

use crate::collision::types::Vec3;

/// World up axis.
#[inline]
pub fn up() -> Vec3 {
    Vec3::new(0.0, 1.0, 0.0)
}

/// Horizontal (XZ) component of a vector.
#[inline]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Project `v` onto the plane with unit normal `n`.
#[inline]
pub fn project_onto_plane(v: Vec3, n: Vec3) -> Vec3 {
    v - n * v.dot(&n)
}

/// Angle in degrees between world up and `normal`.
///
/// Degenerate normals yield 0 (treated as flat rather than propagating NaN).
#[inline]
pub fn slope_angle_deg(normal: Vec3) -> f32 {
    let len_sq = normal.norm_squared();
    if len_sq <= f32::EPSILON {
        return 0.0;
    }
    let cos = (normal.y / len_sq.sqrt()).clamp(-1.0, 1.0);
    let deg = cos.acos().to_degrees();
    if deg.is_finite() { deg } else { 0.0 }
}

/// Downhill direction on a slope with unit normal `n` (unit length), or zero
/// if the surface is flat.
#[inline]
pub fn downhill_on(n: Vec3) -> Vec3 {
    let d = project_onto_plane(-up(), n);
    let len = d.norm();
    if len <= 1.0e-6 { Vec3::zeros() } else { d / len }
}

/// Replace non-finite components with zero.
///
/// A single degenerate normal or division must never propagate into
/// persistent velocity corruption.
#[inline]
pub fn sanitize(v: Vec3) -> Vec3 {
    Vec3::new(
        sanitize_scalar(v.x),
        sanitize_scalar(v.y),
        sanitize_scalar(v.z),
    )
}

/// Reset a non-finite scalar to zero.
#[inline]
pub fn sanitize_scalar(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

/// Linear interpolation.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Frame-rate independent exponential blend factor for rate `rate` (1/s).
#[inline]
pub fn exp_blend(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Normalize, or zero if too short.
#[inline]
pub fn normalize_or_zero(v: Vec3) -> Vec3 {
    let len = v.norm();
    if len <= 1.0e-6 { Vec3::zeros() } else { v / len }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slope_angle_of_tilted_normal() {
        let deg = 30.0_f32.to_radians();
        let n = Vec3::new(deg.sin(), deg.cos(), 0.0);
        assert!((slope_angle_deg(n) - 30.0).abs() < 1.0e-3);
        assert_eq!(slope_angle_deg(Vec3::zeros()), 0.0);
    }

    #[test]
    fn downhill_points_down_the_slope() {
        let deg = 45.0_f32.to_radians();
        let n = Vec3::new(deg.sin(), deg.cos(), 0.0);
        let d = downhill_on(n);
        // A normal leaning toward +X means the surface descends toward +X.
        assert!(d.x > 0.0);
        assert!(d.y < 0.0);
        assert!((d.norm() - 1.0).abs() < 1.0e-4);
        assert!(d.dot(&n).abs() < 1.0e-4);
    }

    #[test]
    fn sanitize_clears_nan_and_inf() {
        let v = sanitize(Vec3::new(f32::NAN, f32::INFINITY, 3.0));
        assert_eq!(v, Vec3::new(0.0, 0.0, 3.0));
    }
}
