//! Chunk system for cubic regions of the sculpture.
//!
//! A chunk stores `(S+1)^3` voxels for an `S`-sized region: the extra
//! layer on the positive faces mirrors the border voxels of the adjacent
//! chunks ("padding"), so extracting a mesh for one chunk never has to
//! reach into its neighbors.

use crate::core::types::{IVec3, Vec3};
use crate::math::Aabb;
use crate::sdf::Sdf;
use crate::voxel::cell::CellData;
use crate::voxel::grid::VoxelGrid;
use crate::voxel::voxel::{HermiteEdge, Voxel};

/// Integer coordinate identifying a chunk in the sculpture grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkPos {
    /// Create a new chunk position
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing the given voxel coordinate. Floor division, not
    /// truncation, so negative coordinates map correctly.
    pub fn from_voxel(x: i32, y: i32, z: i32, chunk_size: i32) -> Self {
        Self {
            x: x.div_euclid(chunk_size),
            y: y.div_euclid(chunk_size),
            z: z.div_euclid(chunk_size),
        }
    }

    /// Chunk containing the given local-space position
    pub fn from_local(pos: Vec3, chunk_size: i32) -> Self {
        Self {
            x: (pos.x / chunk_size as f32).floor() as i32,
            y: (pos.y / chunk_size as f32).floor() as i32,
            z: (pos.z / chunk_size as f32).floor() as i32,
        }
    }

    /// Voxel coordinate of this chunk's minimum corner
    pub fn origin(&self, chunk_size: i32) -> IVec3 {
        IVec3::new(
            self.x * chunk_size,
            self.y * chunk_size,
            self.z * chunk_size,
        )
    }
}

/// A single chunk of the sculpture voxel field
pub struct Chunk {
    pos: ChunkPos,
    size: usize,
    voxels: VoxelGrid,
    needs_rebuild: bool,
}

impl Chunk {
    /// Create a new empty chunk at the given position
    pub fn new(pos: ChunkPos, chunk_size: i32) -> Self {
        let size = chunk_size.max(1) as usize;
        Self {
            pos,
            size,
            voxels: VoxelGrid::new(size + 1, size + 1, size + 1),
            needs_rebuild: false,
        }
    }

    /// Rebuild a chunk from an existing `(S+1)^3` grid
    pub fn from_voxels(pos: ChunkPos, chunk_size: i32, voxels: VoxelGrid) -> Self {
        Self {
            pos,
            size: chunk_size.max(1) as usize,
            voxels,
            needs_rebuild: false,
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Edge length of this chunk in voxels (grid side is `size() + 1`)
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn voxels(&self) -> &VoxelGrid {
        &self.voxels
    }

    /// Whether the chunk changed since its mesh was last extracted
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Clear the dirty flag after extraction
    pub fn mark_built(&mut self) {
        self.needs_rebuild = false;
    }

    /// Local-space bounding box of this chunk's region
    pub fn bounds(&self) -> Aabb {
        let origin = self.pos.origin(self.size as i32).as_vec3();
        Aabb::new(origin, origin + Vec3::splat(self.size as f32))
    }

    /// Read a voxel by chunk-local coordinates (padding included)
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> Voxel {
        self.voxels.get(x, y, z)
    }

    /// Material by chunk-local coordinates
    pub fn material(&self, x: usize, y: usize, z: usize) -> i32 {
        self.voxels.get(x, y, z).material
    }

    /// Write a voxel's material; marks the chunk dirty when it changes
    pub fn set_material(&mut self, x: usize, y: usize, z: usize, material: i32) -> bool {
        let voxel = self.voxels.get(x, y, z);
        if voxel.material == material {
            return false;
        }
        self.voxels.set(x, y, z, voxel.with_material(material));
        self.needs_rebuild = true;
        true
    }

    /// Write one edge sample; marks the chunk dirty when it changes
    pub fn set_edge(&mut self, x: usize, y: usize, z: usize, axis: usize, edge: HermiteEdge) -> bool {
        let voxel = self.voxels.get(x, y, z);
        if voxel.edges[axis] == edge {
            return false;
        }
        self.voxels.set(x, y, z, voxel.with_edge(axis, edge));
        self.needs_rebuild = true;
        true
    }

    /// Apply an SDF edit to this chunk. `origin` is the shape's local
    /// origin in chunk-local coordinates (i.e. minus the chunk origin).
    pub fn apply_sdf<S: Sdf>(
        &mut self,
        origin: Vec3,
        sdf: &S,
        material: i32,
        replace: bool,
    ) -> bool {
        let changed = self.voxels.apply_sdf(origin, sdf, material, replace);
        if changed {
            self.needs_rebuild = true;
        }
        changed
    }

    /// Copy the border voxels of a positive neighbor into this chunk's
    /// padding. `neighbor` must sit at offset {0,1}^3 \ {0} from this
    /// chunk; face, edge and corner neighbors each update their slice.
    pub fn update_padding(&mut self, neighbor: &Chunk) {
        let xo = neighbor.pos.x - self.pos.x;
        let yo = neighbor.pos.y - self.pos.y;
        let zo = neighbor.pos.z - self.pos.z;
        debug_assert!(
            (0..=1).contains(&xo)
                && (0..=1).contains(&yo)
                && (0..=1).contains(&zo)
                && xo + yo + zo != 0,
            "chunk at {:?} is not a positive neighbor of {:?}",
            neighbor.pos,
            self.pos
        );

        let size = self.size;
        // offset 0 covers the shared span [0, S); offset 1 is the single
        // padding layer at S
        let range = |offset: i32| if offset == 0 { (0, size) } else { (size, size + 1) };
        let (xs, xe) = range(xo);
        let (ys, ye) = range(yo);
        let (zs, ze) = range(zo);

        for z in zs..ze {
            for y in ys..ye {
                for x in xs..xe {
                    let voxel = neighbor.voxels.get(x % size, y % size, z % size);
                    self.voxels.set(x, y, z, voxel);
                }
            }
        }
    }

    /// Assemble extraction input for one cell; valid for `0..size()` on
    /// each axis thanks to the padding layer.
    pub fn cell_data(&self, x: usize, y: usize, z: usize) -> CellData {
        self.voxels.cell_data(x, y, z)
    }
}
