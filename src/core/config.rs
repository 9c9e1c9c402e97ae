//! Runtime configuration for the sculpting engine.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Tunable parameters for a sculpting session.
///
/// All fields have working defaults; configs are persisted as JSON so a
/// host application can ship presets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SculptConfig {
    /// Edge length of a chunk in voxels (the chunk grid carries one extra
    /// padding layer on the positive faces).
    pub chunk_size: i32,
    /// March step for ray picking, in local voxel units.
    pub ray_step: f32,
    /// Margin in cells kept free on every side when a mesh is voxelized.
    pub grid_padding: f32,
}

impl Default for SculptConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            ray_step: 0.1,
            grid_padding: 2.5,
        }
    }
}

impl SculptConfig {
    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<(), io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)
    }

    /// Load from file (sync)
    pub fn load_sync(path: &Path) -> Result<Self, io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SculptConfig::default();
        assert_eq!(config.chunk_size, 16);
        assert!(config.ray_step > 0.0);
        assert!(config.grid_padding > 0.0);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sculpt.json");

        let mut config = SculptConfig::default();
        config.chunk_size = 32;
        config.save_sync(&path).unwrap();

        let loaded = SculptConfig::load_sync(&path).unwrap();
        assert_eq!(loaded.chunk_size, 32);
        assert_eq!(loaded.ray_step, config.ray_step);
    }
}
