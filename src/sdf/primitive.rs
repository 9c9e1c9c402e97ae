//! Primitive SDF shapes

use noise::{NoiseFn, Perlin};

use crate::core::types::{Vec2, Vec3};
use super::Sdf;

/// Sphere of the given radius, centered at the origin
#[derive(Debug, Clone, Copy)]
pub struct SphereSdf {
    radius: f32,
}

impl SphereSdf {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

impl Sdf for SphereSdf {
    fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        (x * x + y * y + z * z).sqrt() - self.radius as f64
    }

    fn min(&self) -> Vec3 {
        Vec3::splat(-self.radius)
    }

    fn max(&self) -> Vec3 {
        Vec3::splat(self.radius)
    }
}

/// Axis-aligned cube with half-extent `radius`, centered at the origin
#[derive(Debug, Clone, Copy)]
pub struct BoxSdf {
    radius: f32,
}

impl BoxSdf {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

impl Sdf for BoxSdf {
    fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        let r = self.radius as f64;
        let dx = x.abs() - r;
        let dy = y.abs() - r;
        let dz = z.abs() - r;
        let outside =
            (dx.max(0.0).powi(2) + dy.max(0.0).powi(2) + dz.max(0.0).powi(2)).sqrt();
        outside + dx.max(dy.max(dz)).min(0.0)
    }

    fn min(&self) -> Vec3 {
        Vec3::splat(-self.radius)
    }

    fn max(&self) -> Vec3 {
        Vec3::splat(self.radius)
    }
}

/// Fractal Perlin heightfield clipped to a box: the surface is
/// `y = noise(x, z)` inside the given bounds.
#[derive(Clone)]
pub struct PerlinSdf {
    min: Vec3,
    max: Vec3,
    sample_offset: Vec2,
    scale: Vec2,
    amplitude: f32,
    octaves: u32,
    octave_scale: f32,
    octave_amplitude: f32,
    noise: Perlin,
}

impl PerlinSdf {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        min: Vec3,
        max: Vec3,
        sample_offset: Vec2,
        scale: Vec2,
        amplitude: f32,
        octaves: u32,
        octave_scale: f32,
        octave_amplitude: f32,
        seed: u32,
    ) -> Self {
        Self {
            min,
            max,
            sample_offset,
            scale,
            amplitude,
            octaves,
            octave_scale,
            octave_amplitude,
            noise: Perlin::new(seed),
        }
    }

    fn height(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut scale = self.scale;
        let mut amplitude = self.amplitude as f64;
        for _ in 0..self.octaves {
            let n = self.noise.get([x * scale.x as f64, z * scale.y as f64]);
            // Perlin output is [-1, 1]; the heightfield accumulates [0, 1] octaves
            total += (n * 0.5 + 0.5) * amplitude;
            scale *= self.octave_scale;
            amplitude *= self.octave_amplitude as f64;
        }
        total
    }
}

impl Sdf for PerlinSdf {
    fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        let ex = (self.max.x - self.min.x) as f64;
        let ey = (self.max.y - self.min.y) as f64;
        let ez = (self.max.z - self.min.z) as f64;

        let dx = x.abs() - ex;
        let dy = y.abs() - ey;
        let dz = z.abs() - ez;
        let dist_bounds =
            (dx.max(0.0).powi(2) + dy.max(0.0).powi(2) + dz.max(0.0).powi(2)).sqrt()
                + dx.max(dy.max(dz)).min(0.0);

        let dist_noise = y
            - self.height(
                x - self.min.x as f64 + self.sample_offset.x as f64,
                z - self.min.z as f64 + self.sample_offset.y as f64,
            );

        dist_bounds.max(dist_noise)
    }

    fn min(&self) -> Vec3 {
        self.min
    }

    fn max(&self) -> Vec3 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_sdf() {
        let sphere = SphereSdf::new(1.0);
        assert!(sphere.eval(0.0, 0.0, 0.0) < 0.0);
        assert!((sphere.eval(1.0, 0.0, 0.0)).abs() < 1e-6);
        assert!((sphere.eval(2.0, 0.0, 0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_bounds() {
        let sphere = SphereSdf::new(2.0);
        assert_eq!(sphere.min(), Vec3::splat(-2.0));
        assert_eq!(sphere.max(), Vec3::splat(2.0));
    }

    #[test]
    fn test_box_sdf() {
        let cube = BoxSdf::new(1.0);
        assert!(cube.eval(0.0, 0.0, 0.0) < 0.0);
        assert!((cube.eval(1.0, 0.0, 0.0)).abs() < 1e-6);
        assert!(cube.eval(2.0, 2.0, 2.0) > 0.0);
        // Inside distance is to the nearest face
        assert!((cube.eval(0.5, 0.0, 0.0) - (-0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_perlin_sdf_sign() {
        let perlin = PerlinSdf::new(
            Vec3::splat(-8.0),
            Vec3::splat(8.0),
            Vec2::ZERO,
            Vec2::splat(0.1),
            6.0,
            4,
            2.0,
            0.25,
            42,
        );
        // Far below any possible height: inside; far above: outside
        assert!(perlin.eval(0.0, -7.0, 0.0) < 0.0);
        assert!(perlin.eval(0.0, 100.0, 0.0) > 0.0);
    }
}
