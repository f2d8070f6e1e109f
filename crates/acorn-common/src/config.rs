//! Configuration structures for AcornDB.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for an AcornDB instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding relation and index files.
    pub data_dir: PathBuf,
    /// Number of frames in the buffer pool.
    pub buffer_frames: usize,
    /// Enable fsync after page writes.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            buffer_frames: 1024, // 4 MB with 4 KB pages
            fsync_enabled: true,
        }
    }
}

impl StorageConfig {
    /// Returns the total buffer pool size in bytes.
    pub fn buffer_pool_size_bytes(&self) -> usize {
        self.buffer_frames * crate::page::PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PAGE_SIZE;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.buffer_frames, 1024);
        assert!(config.fsync_enabled);
    }

    #[test]
    fn test_buffer_pool_size_bytes() {
        let config = StorageConfig::default();
        assert_eq!(config.buffer_pool_size_bytes(), 1024 * PAGE_SIZE);

        let small = StorageConfig {
            buffer_frames: 16,
            ..Default::default()
        };
        assert_eq!(small.buffer_pool_size_bytes(), 16 * PAGE_SIZE);
    }

    #[test]
    fn test_serde_roundtrip() {
        let original = StorageConfig {
            data_dir: PathBuf::from("/var/lib/acorndb"),
            buffer_frames: 256,
            fsync_enabled: false,
        };
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: StorageConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original.data_dir, deserialized.data_dir);
        assert_eq!(original.buffer_frames, deserialized.buffer_frames);
        assert_eq!(original.fsync_enabled, deserialized.fsync_enabled);
    }
}
