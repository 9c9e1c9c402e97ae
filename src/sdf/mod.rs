//! Signed distance field capability and surface localization.
//!
//! An [`Sdf`] is a pure function from a point to a signed distance
//! (negative inside, positive outside) plus a conservative bounding box.
//! Every sculpting edit is parameterized over one; wrappers in
//! [`compose`] translate, scale and rigidly transform shapes without
//! breaking the eval/bounds contract.

use glam::DVec3;

use crate::core::types::Vec3;
use crate::math::Aabb;

pub mod primitive;
pub mod compose;

pub use primitive::{BoxSdf, PerlinSdf, SphereSdf};
pub use compose::{OffsetSdf, ScaleSdf, TransformSdf};

/// Signed distance field capability.
///
/// `eval` must be callable at arbitrary coordinates, including outside the
/// declared bounds, and its sign out there must still read "outside".
pub trait Sdf {
    /// Signed distance from the surface (negative inside)
    fn eval(&self, x: f64, y: f64, z: f64) -> f64;
    /// Minimum corner of the bounding box
    fn min(&self) -> Vec3;
    /// Maximum corner of the bounding box
    fn max(&self) -> Vec3;

    /// Bounding box of the shape
    fn bounds(&self) -> Aabb {
        Aabb::new(self.min(), self.max())
    }
}

impl<S: Sdf + ?Sized> Sdf for &S {
    fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        (**self).eval(x, y, z)
    }

    fn min(&self) -> Vec3 {
        (**self).min()
    }

    fn max(&self) -> Vec3 {
        (**self).max()
    }
}

/// Locate the surface crossing on the segment `p1`..`p2`, whose endpoint
/// distances `d1` and `d2` have opposite signs.
///
/// The midpoint is weighted by the endpoint residual magnitudes so the
/// search leans toward the smaller residual; the same-signed endpoint is
/// replaced each step. Only signs and magnitudes are used, never
/// gradients, so cusped or otherwise non-smooth fields converge too.
/// Returns the endpoint with the smaller remaining residual.
pub fn find_intersection<S: Sdf + ?Sized>(
    p1: DVec3,
    d1: f64,
    p2: DVec3,
    d2: f64,
    sdf: &S,
    epsilon: f64,
    max_steps: u32,
) -> DVec3 {
    let dir = (p2 - p1).normalize();

    let mut a = p1;
    let mut b = p2;
    let mut abs_a = d1.abs();
    let mut abs_b = d2.abs();
    let negative_side = d1 < 0.0;

    for _ in 0..max_steps {
        let mid = (a + dir * abs_a + b - dir * abs_b) * 0.5;
        let d_mid = sdf.eval(mid.x, mid.y, mid.z);

        if (d_mid < 0.0) == negative_side {
            a = mid;
            abs_a = d_mid.abs();
        } else {
            b = mid;
            abs_b = d_mid.abs();
        }

        if abs_a < epsilon || abs_b < epsilon {
            break;
        }
    }

    if abs_a < abs_b { a } else { b }
}

/// Estimate the surface normal at `p` by central differences of `eval`.
pub fn central_difference_normal<S: Sdf + ?Sized>(sdf: &S, p: DVec3, epsilon: f64) -> Vec3 {
    let gradient = DVec3::new(
        sdf.eval(p.x + epsilon, p.y, p.z) - sdf.eval(p.x - epsilon, p.y, p.z),
        sdf.eval(p.x, p.y + epsilon, p.z) - sdf.eval(p.x, p.y - epsilon, p.z),
        sdf.eval(p.x, p.y, p.z + epsilon) - sdf.eval(p.x, p.y, p.z - epsilon),
    );
    gradient.normalize_or_zero().as_vec3()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_intersection_sphere() {
        let sphere = SphereSdf::new(1.0);
        let p1 = DVec3::new(0.5, 0.0, 0.0);
        let p2 = DVec3::new(1.5, 0.0, 0.0);
        let d1 = sphere.eval(p1.x, p1.y, p1.z);
        let d2 = sphere.eval(p2.x, p2.y, p2.z);

        let hit = find_intersection(p1, d1, p2, d2, &sphere, 1e-4, 8);
        assert!((hit.x - 1.0).abs() < 1e-3);
        assert!(hit.y.abs() < 1e-6);
    }

    #[test]
    fn test_find_intersection_from_inside_out() {
        // Opposite orientation: p1 outside, p2 inside
        let sphere = SphereSdf::new(2.0);
        let p1 = DVec3::new(3.0, 0.0, 0.0);
        let p2 = DVec3::new(1.5, 0.0, 0.5);
        let d1 = sphere.eval(p1.x, p1.y, p1.z);
        let d2 = sphere.eval(p2.x, p2.y, p2.z);
        assert!(d1 > 0.0 && d2 < 0.0);

        let hit = find_intersection(p1, d1, p2, d2, &sphere, 1e-4, 8);
        let dist = sphere.eval(hit.x, hit.y, hit.z).abs();
        assert!(dist < 1e-2);
    }

    #[test]
    fn test_central_difference_normal() {
        let sphere = SphereSdf::new(1.0);
        let n = central_difference_normal(&sphere, DVec3::new(1.0, 0.0, 0.0), 1e-4);
        assert!((n.x - 1.0).abs() < 1e-3);
        assert!((n.length() - 1.0).abs() < 1e-3);
    }
}
