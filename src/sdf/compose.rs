//! SDF composition wrappers
//!
//! Each wrapper preserves the eval/bounds contract of the inner shape
//! exactly; see the trait docs for the obligations.

use crate::core::types::{Mat4, Vec3};
use crate::math::Aabb;
use super::Sdf;

/// Inner shape translated by `-offset`
#[derive(Debug, Clone, Copy)]
pub struct OffsetSdf<S> {
    offset: Vec3,
    sdf: S,
}

impl<S: Sdf> OffsetSdf<S> {
    pub fn new(offset: Vec3, sdf: S) -> Self {
        Self { offset, sdf }
    }
}

impl<S: Sdf> Sdf for OffsetSdf<S> {
    fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        self.sdf.eval(
            x + self.offset.x as f64,
            y + self.offset.y as f64,
            z + self.offset.z as f64,
        )
    }

    fn min(&self) -> Vec3 {
        self.sdf.min() - self.offset
    }

    fn max(&self) -> Vec3 {
        self.sdf.max() - self.offset
    }
}

/// Inner shape scaled uniformly by `scale`
#[derive(Debug, Clone, Copy)]
pub struct ScaleSdf<S> {
    scale: f32,
    sdf: S,
}

impl<S: Sdf> ScaleSdf<S> {
    pub fn new(scale: f32, sdf: S) -> Self {
        Self { scale, sdf }
    }
}

impl<S: Sdf> Sdf for ScaleSdf<S> {
    fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        let k = self.scale as f64;
        self.sdf.eval(x / k, y / k, z / k) * k
    }

    fn min(&self) -> Vec3 {
        self.sdf.min() * self.scale
    }

    fn max(&self) -> Vec3 {
        self.sdf.max() * self.scale
    }
}

/// Inner shape under an arbitrary affine transform.
///
/// Bounds are the transformed corners of the inner bounds, so they stay
/// conservative for rotations.
#[derive(Debug, Clone, Copy)]
pub struct TransformSdf<S> {
    transform: Mat4,
    inverse: Mat4,
    sdf: S,
}

impl<S: Sdf> TransformSdf<S> {
    pub fn new(transform: Mat4, sdf: S) -> Self {
        Self {
            transform,
            inverse: transform.inverse(),
            sdf,
        }
    }

    fn world_bounds(&self) -> Aabb {
        let lmin = self.sdf.min();
        let lmax = self.sdf.max();

        let mut bounds = Aabb::new(Vec3::splat(f32::MAX), Vec3::splat(f32::MIN));
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { lmin.x } else { lmax.x },
                if i & 2 == 0 { lmin.y } else { lmax.y },
                if i & 4 == 0 { lmin.z } else { lmax.z },
            );
            bounds.expand(self.transform.transform_point3(corner));
        }
        bounds
    }
}

impl<S: Sdf> Sdf for TransformSdf<S> {
    fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        let p = self
            .inverse
            .transform_point3(Vec3::new(x as f32, y as f32, z as f32));
        self.sdf.eval(p.x as f64, p.y as f64, p.z as f64)
    }

    fn min(&self) -> Vec3 {
        self.world_bounds().min
    }

    fn max(&self) -> Vec3 {
        self.world_bounds().max
    }
}
