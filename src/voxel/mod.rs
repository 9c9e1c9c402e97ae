//! Voxel data structures and operations

pub mod voxel;
pub mod grid;
pub mod cell;
pub mod chunk;
pub mod field;
pub mod snapshot;

pub use voxel::{HermiteEdge, Voxel};
pub use grid::VoxelGrid;
pub use cell::CellData;
pub use chunk::{Chunk, ChunkPos};
pub use field::{ChunkField, RayHit};
