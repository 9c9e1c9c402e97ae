//! Chunk field: multi-chunk edit routing, border synchronization and
//! ray picking.
//!
//! Concurrency contract: `apply_sdf` takes `&mut self`, so there is
//! exactly one writer per field. Within one call the per-chunk edit
//! kernels run on the rayon pool over disjoint chunks and are joined
//! before border propagation reads any chunk's final state. Extraction
//! reads (`cell_data`, chunk iteration) cannot overlap a writer because
//! they borrow the field shared.

use std::collections::{HashMap, HashSet};

use rayon::iter::{ParallelBridge, ParallelIterator};

use crate::core::config::SculptConfig;
use crate::core::types::{IVec3, Mat4, Quat, Vec3};
use crate::sdf::{OffsetSdf, Sdf, TransformSdf};
use crate::voxel::cell::CellData;
use crate::voxel::chunk::{Chunk, ChunkPos};
use crate::voxel::grid::VoxelGrid;
use crate::voxel::voxel::{HermiteEdge, Voxel};

/// Offsets of the 7 chunks that share a face, edge or corner with a
/// chunk's positive padding layer.
const PADDING_NEIGHBORS: [[i32; 3]; 7] = [
    [1, 0, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 1, 0],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Result of a successful ray pick
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    /// First cell whose 2x2x2 neighborhood contains solid material
    pub cell: IVec3,
    /// The cell visited immediately before the hit
    pub side: IVec3,
    /// Chunk containing the solid voxel that triggered the hit
    pub chunk: ChunkPos,
}

/// Sparse field of voxel chunks forming one sculpture.
///
/// Chunks are created lazily the first time an edit's bounding box touches
/// their coordinate and destroyed only by [`ChunkField::clear`].
pub struct ChunkField {
    config: SculptConfig,
    chunks: HashMap<ChunkPos, Chunk>,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl ChunkField {
    /// Create an empty field with default configuration
    pub fn new() -> Self {
        Self::with_config(SculptConfig::default())
    }

    /// Create an empty field with the given configuration
    pub fn with_config(config: SculptConfig) -> Self {
        Self {
            config,
            chunks: HashMap::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn config(&self) -> &SculptConfig {
        &self.config
    }

    pub fn chunk_size(&self) -> i32 {
        self.config.chunk_size
    }

    /// Set the sculpture's world pose
    pub fn set_pose(&mut self, position: Vec3, rotation: Quat, scale: Vec3) {
        self.position = position;
        self.rotation = rotation;
        self.scale = scale;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    fn world_to_local_point(&self, point: Vec3) -> Vec3 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
            .inverse()
            .transform_point3(point)
    }

    fn world_to_local_dir(&self, dir: Vec3) -> Vec3 {
        self.rotation.inverse() * dir
    }

    pub fn get_chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub fn get_chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.chunks.get_mut(&pos)
    }

    /// Iterate all live chunks
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Insert a prebuilt chunk (snapshot restore)
    pub fn insert_chunk(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.pos(), chunk);
    }

    /// Drop every chunk
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Read a voxel by field-local voxel coordinate; absent chunks read as
    /// empty space.
    pub fn get_voxel(&self, pos: IVec3) -> Voxel {
        let chunk_size = self.config.chunk_size;
        match self.chunks.get(&ChunkPos::from_voxel(pos.x, pos.y, pos.z, chunk_size)) {
            Some(chunk) => chunk.voxel(
                pos.x.rem_euclid(chunk_size) as usize,
                pos.y.rem_euclid(chunk_size) as usize,
                pos.z.rem_euclid(chunk_size) as usize,
            ),
            None => Voxel::EMPTY,
        }
    }

    /// Material by field-local voxel coordinate
    pub fn get_material(&self, pos: IVec3) -> i32 {
        self.get_voxel(pos).material
    }

    /// Assemble the extraction contract for the cell at `pos`, reading
    /// across chunk boundaries (up to 8 chunks) as needed.
    pub fn cell_data(&self, pos: IVec3) -> CellData {
        CellData::from_corners(|dx, dy, dz| {
            self.get_voxel(pos + IVec3::new(dx as i32, dy as i32, dz as i32))
        })
    }

    /// Apply a signed distance field to the sculpture.
    ///
    /// The shape is given in its own local frame at a world pose; it is
    /// transformed into sculpture-local space where 1 voxel = 1 unit of
    /// the distance field.
    pub fn apply_sdf<S: Sdf + Sync>(
        &mut self,
        world_pos: Vec3,
        world_rot: Quat,
        sdf: &S,
        material: i32,
        replace: bool,
    ) {
        let pos = self.world_to_local_point(world_pos);
        let rot = self.rotation.inverse() * world_rot;
        log::debug!("apply sdf at {pos} material {material} replace {replace}");

        let shape = TransformSdf::new(Mat4::from_rotation_translation(rot, pos), sdf);
        self.apply_sdf_local(&shape, material, replace);
    }

    /// Apply a shape positioned at `origin` in sculpture-local space
    pub fn apply_sdf_at<S: Sdf + Sync>(
        &mut self,
        origin: Vec3,
        sdf: &S,
        material: i32,
        replace: bool,
    ) {
        let shape = OffsetSdf::new(-origin, sdf);
        self.apply_sdf_local(&shape, material, replace);
    }

    /// Apply a shape already expressed in sculpture-local space
    pub fn apply_sdf_local<S: Sdf + Sync>(&mut self, sdf: &S, material: i32, replace: bool) {
        let chunk_size = self.config.chunk_size;
        let min = ChunkPos::from_local(sdf.min(), chunk_size);
        let max = ChunkPos::from_local(sdf.max(), chunk_size);

        let mut touched = Vec::new();
        for cx in min.x..=max.x {
            for cy in min.y..=max.y {
                for cz in min.z..=max.z {
                    let pos = ChunkPos::new(cx, cy, cz);
                    self.ensure_chunk(pos);
                    touched.push(pos);
                }
            }
        }

        // Edit every touched chunk; kernels own disjoint grids, and the
        // join completes before any border propagation below.
        self.chunks
            .iter_mut()
            .filter(|(pos, _)| {
                (min.x..=max.x).contains(&pos.x)
                    && (min.y..=max.y).contains(&pos.y)
                    && (min.z..=max.z).contains(&pos.z)
            })
            .par_bridge()
            .for_each(|(pos, chunk)| {
                let origin = -(pos.origin(chunk_size).as_vec3());
                chunk.apply_sdf(origin, sdf, material, replace);
            });

        for pos in touched {
            self.propagate_padding(pos);
        }
    }

    /// Merge a precomputed voxel grid (e.g. a voxelized mesh) into the
    /// field at `origin`, with the same two-pass discipline as an SDF
    /// edit: solid materials union in first, then edges are settled
    /// against the final materials of both endpoints.
    pub fn merge_grid(&mut self, origin: IVec3, grid: &VoxelGrid) {
        let width = grid.len(0) as i32;
        let height = grid.len(1) as i32;
        let depth = grid.len(2) as i32;

        let mut touched = HashSet::new();

        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    let voxel = grid.get(x as usize, y as usize, z as usize);
                    if voxel.material != 0 {
                        self.set_voxel_material(
                            origin + IVec3::new(x, y, z),
                            voxel.material,
                            &mut touched,
                        );
                    }
                }
            }
        }

        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    let voxel = grid.get(x as usize, y as usize, z as usize);
                    let a = origin + IVec3::new(x, y, z);

                    for (axis, offset) in [IVec3::X, IVec3::Y, IVec3::Z].iter().enumerate() {
                        let material_a = self.get_material(a);
                        let material_b = self.get_material(a + *offset);

                        if material_a != material_b {
                            let edge = voxel.edges[axis];
                            if edge.has_crossing() {
                                self.set_voxel_edge(a, axis, edge, &mut touched);
                            }
                        } else if material_a != 0 && material_b != 0 {
                            // Interior edge: no boundary survives the merge
                            self.set_voxel_edge(a, axis, HermiteEdge::default(), &mut touched);
                        }
                    }
                }
            }
        }

        for pos in touched {
            self.propagate_padding(pos);
        }
    }

    /// Pick the first solid cell along a world-space ray.
    ///
    /// Fixed-step marching: whenever the visited integer cell changes, the
    /// 2x2x2 neighborhood around it is tested for solid material across
    /// chunk boundaries. Features smaller than the step can be skipped;
    /// that is accepted behavior for picking.
    pub fn ray_cast(&self, world_origin: Vec3, world_dir: Vec3, max_distance: f32) -> Option<RayHit> {
        let mut pos = self.world_to_local_point(world_origin);
        let dir = self.world_to_local_dir(world_dir);
        if dir.length_squared() < 1e-12 {
            return None;
        }

        let chunk_size = self.config.chunk_size;
        let step = self.config.ray_step;
        let step_offset = dir.normalize() * step;
        let mut prev = IVec3::splat(i32::MAX);

        let steps = (max_distance / step) as i32;
        for _ in 0..steps {
            let cell = IVec3::new(
                pos.x.floor() as i32,
                pos.y.floor() as i32,
                pos.z.floor() as i32,
            );

            if cell != prev {
                for zo in 0..2 {
                    for yo in 0..2 {
                        for xo in 0..2 {
                            let probe = cell + IVec3::new(xo, yo, zo);
                            let chunk_pos =
                                ChunkPos::from_voxel(probe.x, probe.y, probe.z, chunk_size);
                            let Some(chunk) = self.chunks.get(&chunk_pos) else {
                                continue;
                            };
                            let material = chunk.material(
                                probe.x.rem_euclid(chunk_size) as usize,
                                probe.y.rem_euclid(chunk_size) as usize,
                                probe.z.rem_euclid(chunk_size) as usize,
                            );
                            if material != 0 {
                                return Some(RayHit {
                                    cell,
                                    side: prev,
                                    chunk: chunk_pos,
                                });
                            }
                        }
                    }
                }
                prev = cell;
            }

            pos += step_offset;
        }

        None
    }

    /// Create the chunk if missing. A fresh chunk pulls padding from any
    /// already-live positive neighbors so shared borders agree from birth.
    fn ensure_chunk(&mut self, pos: ChunkPos) {
        if self.chunks.contains_key(&pos) {
            return;
        }

        let mut chunk = Chunk::new(pos, self.config.chunk_size);
        for offset in PADDING_NEIGHBORS {
            let neighbor_pos = ChunkPos::new(pos.x + offset[0], pos.y + offset[1], pos.z + offset[2]);
            if let Some(neighbor) = self.chunks.get(&neighbor_pos) {
                chunk.update_padding(neighbor);
            }
        }
        self.chunks.insert(pos, chunk);
    }

    /// Copy this chunk's -X/-Y/-Z border voxels into the padding of the 7
    /// lower neighbors. A verbatim copy, never re-derived, so shared edge
    /// data is bit-identical between neighbors regardless of edit order.
    fn propagate_padding(&mut self, pos: ChunkPos) {
        let Some(source) = self.chunks.remove(&pos) else {
            return;
        };
        for offset in PADDING_NEIGHBORS {
            let neighbor_pos = ChunkPos::new(pos.x - offset[0], pos.y - offset[1], pos.z - offset[2]);
            if let Some(neighbor) = self.chunks.get_mut(&neighbor_pos) {
                neighbor.update_padding(&source);
            }
        }
        self.chunks.insert(pos, source);
    }

    fn set_voxel_material(&mut self, pos: IVec3, material: i32, touched: &mut HashSet<ChunkPos>) {
        let chunk_size = self.config.chunk_size;
        let chunk_pos = ChunkPos::from_voxel(pos.x, pos.y, pos.z, chunk_size);
        self.ensure_chunk(chunk_pos);
        if let Some(chunk) = self.chunks.get_mut(&chunk_pos) {
            if chunk.set_material(
                pos.x.rem_euclid(chunk_size) as usize,
                pos.y.rem_euclid(chunk_size) as usize,
                pos.z.rem_euclid(chunk_size) as usize,
                material,
            ) {
                touched.insert(chunk_pos);
            }
        }
    }

    fn set_voxel_edge(
        &mut self,
        pos: IVec3,
        axis: usize,
        edge: HermiteEdge,
        touched: &mut HashSet<ChunkPos>,
    ) {
        let chunk_size = self.config.chunk_size;
        let chunk_pos = ChunkPos::from_voxel(pos.x, pos.y, pos.z, chunk_size);
        self.ensure_chunk(chunk_pos);
        if let Some(chunk) = self.chunks.get_mut(&chunk_pos) {
            if chunk.set_edge(
                pos.x.rem_euclid(chunk_size) as usize,
                pos.y.rem_euclid(chunk_size) as usize,
                pos.z.rem_euclid(chunk_size) as usize,
                axis,
                edge,
            ) {
                touched.insert(chunk_pos);
            }
        }
    }
}

impl Default for ChunkField {
    fn default() -> Self {
        Self::new()
    }
}
