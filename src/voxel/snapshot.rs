//! Field snapshot serialization and disk I/O.
//!
//! A snapshot is the whole sculpture: config, pose and every chunk.
//! Since Voxel implements Pod (bytemuck), chunk grids serialize directly
//! as byte arrays; the archive is LZ4-compressed on disk.

use std::io;
use std::path::Path;

use rkyv::{Archive, Deserialize, Serialize};

use crate::core::config::SculptConfig;
use crate::core::types::{Quat, Vec3};
use crate::voxel::chunk::{Chunk, ChunkPos};
use crate::voxel::field::ChunkField;
use crate::voxel::grid::VoxelGrid;
use crate::voxel::voxel::Voxel;

/// Serializable chunk payload
#[derive(Archive, Deserialize, Serialize)]
struct ChunkData {
    x: i32,
    y: i32,
    z: i32,
    size: u32,
    /// Raw voxel bytes in grid index order
    voxels: Vec<u8>,
}

/// Serializable field payload
#[derive(Archive, Deserialize, Serialize)]
struct FieldData {
    chunk_size: i32,
    ray_step: f32,
    grid_padding: f32,
    position: [f32; 3],
    rotation: [f32; 4],
    scale: [f32; 3],
    chunks: Vec<ChunkData>,
}

/// Serialize a field to bytes (uncompressed)
pub fn serialize_field(field: &ChunkField) -> Result<Vec<u8>, io::Error> {
    let data = FieldData {
        chunk_size: field.config().chunk_size,
        ray_step: field.config().ray_step,
        grid_padding: field.config().grid_padding,
        position: field.position().to_array(),
        rotation: field.rotation().to_array(),
        scale: field.scale().to_array(),
        chunks: field
            .chunks()
            .map(|chunk| ChunkData {
                x: chunk.pos().x,
                y: chunk.pos().y,
                z: chunk.pos().z,
                size: chunk.size() as u32,
                voxels: bytemuck::cast_slice(chunk.voxels().data()).to_vec(),
            })
            .collect(),
    };

    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&data)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    Ok(bytes.to_vec())
}

/// Deserialize a field from bytes (uncompressed)
pub fn deserialize_field(data: &[u8]) -> Result<ChunkField, io::Error> {
    // Re-align: the input may come from an arbitrary byte buffer
    let mut aligned = rkyv::util::AlignedVec::<16>::new();
    aligned.extend_from_slice(data);

    let archived = rkyv::access::<ArchivedFieldData, rkyv::rancor::Error>(&aligned)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let field_data: FieldData = rkyv::deserialize::<FieldData, rkyv::rancor::Error>(archived)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let config = SculptConfig {
        chunk_size: field_data.chunk_size,
        ray_step: field_data.ray_step,
        grid_padding: field_data.grid_padding,
    };

    let mut field = ChunkField::with_config(config);
    field.set_pose(
        Vec3::from_array(field_data.position),
        Quat::from_array(field_data.rotation),
        Vec3::from_array(field_data.scale),
    );

    for chunk_data in field_data.chunks {
        let side = chunk_data.size as usize + 1;
        let voxels: Vec<Voxel> = bytemuck::pod_collect_to_vec(&chunk_data.voxels);
        let grid = VoxelGrid::from_raw(side, side, side, voxels).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "chunk voxel count mismatch")
        })?;

        field.insert_chunk(Chunk::from_voxels(
            ChunkPos::new(chunk_data.x, chunk_data.y, chunk_data.z),
            chunk_data.size as i32,
            grid,
        ));
    }

    Ok(field)
}

/// Save a field to disk (LZ4 compressed)
pub fn save_field(path: &Path, field: &ChunkField) -> Result<(), io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let serialized = serialize_field(field)?;
    let compressed = lz4_flex::compress_prepend_size(&serialized);
    log::debug!(
        "snapshot: {} chunks, {} bytes compressed",
        field.chunk_count(),
        compressed.len()
    );
    std::fs::write(path, compressed)
}

/// Load a field from disk
pub fn load_field(path: &Path) -> Result<ChunkField, io::Error> {
    let compressed = std::fs::read(path)?;
    let serialized = lz4_flex::decompress_size_prepended(&compressed).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("LZ4 decompression failed: {}", e))
    })?;
    deserialize_field(&serialized)
}
