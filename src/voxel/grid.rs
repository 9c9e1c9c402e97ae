//! Dense voxel grid storage and the SDF edit kernel.
//!
//! Storage is a single flat buffer with stride indexing rather than nested
//! arrays, so a whole grid is one allocation and snapshots are a byte cast.
//!
//! Edits run in two passes over the shape's integer bounding box: pass 1
//! writes materials, pass 2 recomputes edge Hermite samples. The split
//! matters because an edge sample depends on the final post-edit materials
//! of both of its endpoints.

use glam::DVec3;

use crate::core::types::Vec3;
use crate::sdf::{Sdf, central_difference_normal, find_intersection};
use crate::voxel::cell::CellData;
use crate::voxel::voxel::{HermiteEdge, Voxel};

/// Residual threshold for the surface bisection search
pub const SURFACE_EPSILON: f64 = 1e-4;

/// Maximum bisection refinement steps per edge
pub const MAX_SURFACE_STEPS: u32 = 8;

/// Dense 3D voxel grid backed by a flat buffer
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid {
    size_x: usize,
    size_y: usize,
    size_z: usize,
    data: Vec<Voxel>,
}

impl VoxelGrid {
    /// Create a grid of empty voxels
    pub fn new(size_x: usize, size_y: usize, size_z: usize) -> Self {
        Self {
            size_x,
            size_y,
            size_z,
            data: vec![Voxel::EMPTY; size_x * size_y * size_z],
        }
    }

    /// Rebuild a grid from raw voxels in index order. Returns None if the
    /// buffer length does not match the dimensions.
    pub fn from_raw(
        size_x: usize,
        size_y: usize,
        size_z: usize,
        data: Vec<Voxel>,
    ) -> Option<Self> {
        if data.len() != size_x * size_y * size_z {
            return None;
        }
        Some(Self {
            size_x,
            size_y,
            size_z,
            data,
        })
    }

    /// Grid extent along one dimension (0 = X, 1 = Y, 2 = Z)
    pub fn len(&self, dim: usize) -> usize {
        match dim {
            0 => self.size_x,
            1 => self.size_y,
            _ => self.size_z,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw voxels in index order (x fastest, then y, then z)
    pub fn data(&self) -> &[Voxel] {
        &self.data
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.size_x + z * self.size_x * self.size_y
    }

    /// Whether signed coordinates land inside the grid
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.size_x
            && (y as usize) < self.size_y
            && (z as usize) < self.size_z
    }

    /// Read a voxel; out-of-range coordinates read as empty space
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Voxel {
        if x < self.size_x && y < self.size_y && z < self.size_z {
            self.data[self.index(x, y, z)]
        } else {
            Voxel::EMPTY
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, voxel: Voxel) {
        let index = self.index(x, y, z);
        self.data[index] = voxel;
    }

    /// Assemble the extraction contract for the cell with origin corner
    /// `(x, y, z)`; valid for cells whose +1 corner is still in the grid.
    pub fn cell_data(&self, x: usize, y: usize, z: usize) -> CellData {
        CellData::from_corners(|dx, dy, dz| self.get(x + dx, y + dy, z + dz))
    }

    /// Apply a signed distance field to the grid.
    ///
    /// `origin` is the position of the shape's local origin in grid
    /// coordinates. With `replace` false, cells where the shape evaluates
    /// negative take `material` (union, or carve when `material` is 0).
    /// With `replace` true only already-solid cells are recolored and the
    /// existing geometry is left untouched.
    ///
    /// Returns whether any material or edge value actually changed.
    pub fn apply_sdf<S: Sdf>(
        &mut self,
        origin: Vec3,
        sdf: &S,
        material: i32,
        replace: bool,
    ) -> bool {
        let shape_min = sdf.min();
        let shape_max = sdf.max();

        let min_x = ((origin.x + shape_min.x).floor() as i32).max(0);
        let min_y = ((origin.y + shape_min.y).floor() as i32).max(0);
        let min_z = ((origin.z + shape_min.z).floor() as i32).max(0);
        let max_x = ((origin.x + shape_max.x).ceil() as i32).min(self.size_x as i32 - 1);
        let max_y = ((origin.y + shape_max.y).ceil() as i32).min(self.size_y as i32 - 1);
        let max_z = ((origin.z + shape_max.z).ceil() as i32).min(self.size_z as i32 - 1);

        // Degenerate or fully clipped bounds are a no-op
        if min_x > max_x || min_y > max_y || min_z > max_z {
            return false;
        }

        let ox = origin.x as f64;
        let oy = origin.y as f64;
        let oz = origin.z as f64;

        let mut changed = false;

        // Pass 1: materials
        for z in min_z..=max_z {
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let d = sdf.eval(x as f64 - ox, y as f64 - oy, z as f64 - oz);
                    if d >= 0.0 {
                        continue;
                    }

                    let voxel = self.get(x as usize, y as usize, z as usize);
                    if voxel.material == material {
                        continue;
                    }
                    if replace && voxel.material == 0 {
                        // Replace never converts empty space into solid
                        continue;
                    }
                    self.set(x as usize, y as usize, z as usize, voxel.with_material(material));
                    changed = true;
                }
            }
        }

        // Pass 2: edges, once every material in the region is final
        for z in min_z..=max_z {
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    for axis in 0..3 {
                        changed |=
                            self.apply_sdf_edge(ox, oy, oz, x, y, z, axis, sdf, material, replace);
                    }
                }
            }
        }

        changed
    }

    /// Update one edge's Hermite sample after a material pass.
    #[allow(clippy::too_many_arguments)]
    fn apply_sdf_edge<S: Sdf>(
        &mut self,
        ox: f64,
        oy: f64,
        oz: f64,
        x: i32,
        y: i32,
        z: i32,
        axis: usize,
        sdf: &S,
        material: i32,
        replace: bool,
    ) -> bool {
        let (nx, ny, nz) = match axis {
            0 => (x + 1, y, z),
            1 => (x, y + 1, z),
            _ => (x, y, z + 1),
        };

        let cell_material = self.get(x as usize, y as usize, z as usize).material;
        let neighbor_in_range = self.in_bounds(nx, ny, nz);
        let neighbor_material = if neighbor_in_range {
            self.get(nx as usize, ny as usize, nz as usize).material
        } else {
            0
        };

        // A replacement is ignored on edges that touch empty space or leave
        // the grid: replace must recolor solid-to-solid contacts only and
        // never move an existing solid/empty boundary.
        let ignored_replacement =
            replace && (cell_material == 0 || !neighbor_in_range || neighbor_material == 0);

        let p1 = DVec3::new(x as f64 - ox, y as f64 - oy, z as f64 - oz);
        let p2 = DVec3::new(nx as f64 - ox, ny as f64 - oy, nz as f64 - oz);
        let d1 = sdf.eval(p1.x, p1.y, p1.z);
        let d2 = sdf.eval(p2.x, p2.y, p2.z);

        if !ignored_replacement {
            if (d1 < 0.0) != (d2 < 0.0) {
                return self.write_crossing(x, y, z, axis, p1, d1, p2, d2, sdf, material);
            }
            if d1 < 0.0 && d2 < 0.0 {
                // Both endpoints solid: the edge carries no boundary
                return self.write_edge(x, y, z, axis, HermiteEdge::default());
            }
        } else if (d1 < 0.0) != (d2 < 0.0) && neighbor_in_range && cell_material == neighbor_material
        {
            // The shape crosses this edge but replace may not alter
            // geometry; refresh the sample only where both endpoints ended
            // up with the same (recolored) material.
            return self.write_crossing(x, y, z, axis, p1, d1, p2, d2, sdf, material);
        }

        false
    }

    #[allow(clippy::too_many_arguments)]
    fn write_crossing<S: Sdf>(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        axis: usize,
        p1: DVec3,
        d1: f64,
        p2: DVec3,
        d2: f64,
        sdf: &S,
        material: i32,
    ) -> bool {
        let hit = find_intersection(p1, d1, p2, d2, sdf, SURFACE_EPSILON, MAX_SURFACE_STEPS);
        let offset = ((hit - p1).length() as f32).clamp(0.0, 1.0);

        let mut normal = central_difference_normal(sdf, hit, SURFACE_EPSILON);
        if material == 0 {
            // Erasure: keep normals pointing into the remaining solid
            normal = -normal;
        }

        self.write_edge(x, y, z, axis, HermiteEdge::new(offset, normal))
    }

    fn write_edge(&mut self, x: i32, y: i32, z: i32, axis: usize, edge: HermiteEdge) -> bool {
        let voxel = self.get(x as usize, y as usize, z as usize);
        if voxel.edges[axis] == edge {
            return false;
        }
        self.set(x as usize, y as usize, z as usize, voxel.with_edge(axis, edge));
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::sdf::{OffsetSdf, SphereSdf};
    use super::*;

    fn sphere_at(center: Vec3, radius: f32) -> OffsetSdf<SphereSdf> {
        OffsetSdf::new(-center, SphereSdf::new(radius))
    }

    #[test]
    fn test_union_fills_interior() {
        let mut grid = VoxelGrid::new(16, 16, 16);
        let changed = grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::splat(8.0), 4.0), 1, false);

        assert!(changed);
        assert_eq!(grid.get(8, 8, 8).material, 1);
        assert_eq!(grid.get(8, 8, 5).material, 1);
        assert_eq!(grid.get(0, 0, 0).material, 0);
        assert_eq!(grid.get(8, 8, 13).material, 0);
    }

    #[test]
    fn test_carve_removes_material() {
        let mut grid = VoxelGrid::new(16, 16, 16);
        grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::splat(8.0), 5.0), 1, false);
        grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::splat(8.0), 2.0), 0, false);

        assert_eq!(grid.get(8, 8, 8).material, 0);
        assert_eq!(grid.get(8, 8, 4).material, 1);

        // Erasure normals point into the carved-out cavity
        let edge = grid.get(8, 8, 9).edges[2];
        assert!(edge.has_crossing());
        assert!(edge.normal.z < 0.0);
    }

    #[test]
    fn test_idempotent_edit() {
        let shape = sphere_at(Vec3::new(7.5, 8.0, 8.5), 4.5);

        let mut once = VoxelGrid::new(16, 16, 16);
        once.apply_sdf(Vec3::ZERO, &shape, 1, false);

        let mut twice = once.clone();
        let changed = twice.apply_sdf(Vec3::ZERO, &shape, 1, false);

        assert!(!changed);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_edge_samples_valid() {
        let center = Vec3::new(7.6, 7.8, 8.2);
        let mut grid = VoxelGrid::new(16, 16, 16);
        grid.apply_sdf(Vec3::ZERO, &sphere_at(center, 4.5), 1, false);

        let mut crossings = 0;
        for z in 0..15 {
            for y in 0..15 {
                for x in 0..15 {
                    let voxel = grid.get(x, y, z);
                    for (axis, &(nx, ny, nz)) in
                        [(x + 1, y, z), (x, y + 1, z), (x, y, z + 1)].iter().enumerate()
                    {
                        let neighbor = grid.get(nx, ny, nz);
                        if (voxel.material == 0) == (neighbor.material == 0) {
                            continue;
                        }
                        crossings += 1;

                        let edge = voxel.edges[axis];
                        assert!((0.0..=1.0).contains(&edge.offset));
                        assert!((edge.normal.length() - 1.0).abs() < 1e-3);

                        // For a union sphere the normal is the outward
                        // gradient: from solid toward empty, radially out
                        let axis_dir = [Vec3::X, Vec3::Y, Vec3::Z][axis];
                        let crossing =
                            Vec3::new(x as f32, y as f32, z as f32) + axis_dir * edge.offset;
                        assert!(edge.normal.dot(crossing - center) > 0.0);
                    }
                }
            }
        }
        assert!(crossings > 0);
    }

    #[test]
    fn test_interior_edges_cleared() {
        let mut grid = VoxelGrid::new(16, 16, 16);
        // Two overlapping spheres: the first surface through (8, 8, 10.5)
        // is swallowed by the second edit and its samples must clear.
        grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::splat(8.0), 2.5), 1, false);
        grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::splat(8.0), 5.5), 1, false);

        let voxel = grid.get(8, 8, 10);
        assert_eq!(voxel.material, 1);
        assert_eq!(grid.get(8, 8, 11).material, 1);
        assert!(!voxel.edges[2].has_crossing());
    }

    #[test]
    fn test_replace_recolors_only_solid() {
        let mut grid = VoxelGrid::new(16, 16, 16);
        grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::splat(8.0), 3.0), 1, false);

        // The replace shape covers both solid and empty cells
        grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::new(10.0, 8.0, 8.0), 3.0), 2, true);

        for z in 0..16 {
            for y in 0..16 {
                for x in 0..16 {
                    let material = grid.get(x, y, z).material;
                    assert!(material == 0 || material == 1 || material == 2);
                }
            }
        }
        // Overlap region recolored, solid-only region untouched, empty stays empty
        assert_eq!(grid.get(10, 8, 8).material, 2);
        assert_eq!(grid.get(6, 8, 8).material, 1);
        assert_eq!(grid.get(12, 8, 8).material, 0);
    }

    #[test]
    fn test_replace_preserves_boundary_geometry() {
        let mut grid = VoxelGrid::new(16, 16, 16);
        grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::splat(8.0), 4.0), 1, false);
        let before = grid.clone();

        // Recolor with a larger shape; solidity must not move anywhere and
        // every solid/empty boundary sample must survive bit-identical.
        grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::splat(8.0), 6.5), 2, true);

        for z in 0..16 {
            for y in 0..16 {
                for x in 0..16 {
                    let old = before.get(x, y, z);
                    let new = grid.get(x, y, z);
                    assert_eq!(old.material == 0, new.material == 0);

                    for (axis, &(nx, ny, nz)) in
                        [(x + 1, y, z), (x, y + 1, z), (x, y, z + 1)].iter().enumerate()
                    {
                        let old_neighbor = before.get(nx, ny, nz);
                        if (old.material == 0) != (old_neighbor.material == 0) {
                            assert_eq!(old.edges[axis], new.edges[axis]);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_degenerate_bounds_no_op() {
        let mut grid = VoxelGrid::new(8, 8, 8);
        // Entirely outside the grid
        let changed = grid.apply_sdf(Vec3::ZERO, &sphere_at(Vec3::splat(100.0), 2.0), 1, false);
        assert!(!changed);
        assert_eq!(grid, VoxelGrid::new(8, 8, 8));
    }

    #[test]
    fn test_out_of_range_reads_empty() {
        let grid = VoxelGrid::new(4, 4, 4);
        assert_eq!(grid.get(100, 0, 0), Voxel::EMPTY);
    }
}
