//! Snapshot persistence for the in-memory backing tables

use super::memory::Tables;
use crate::core::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub tables: Tables,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub definition_count: usize,
    pub value_count: usize,
}

impl StoreSnapshot {
    pub fn new(tables: Tables) -> Self {
        let metadata = SnapshotMetadata {
            created_at: Utc::now(),
            definition_count: tables.definitions.row_count(),
            value_count: tables.values.row_count(),
        };
        Self {
            version: SNAPSHOT_VERSION,
            tables,
            metadata,
        }
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Write to a temp file in the target directory, then rename over the target.
    pub fn save(&self, snapshot: &StoreSnapshot) -> StorageResult<()> {
        let dir = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .map_err(|e| StorageError::IoError(format!("Failed to create snapshot directory: {}", e)))?;

        let serialized = rmp_serde::to_vec(snapshot)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize snapshot: {}", e)))?;

        let temp = NamedTempFile::new_in(&dir)
            .map_err(|e| StorageError::IoError(format!("Failed to create temp file: {}", e)))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            writer
                .write_all(&serialized)
                .map_err(|e| StorageError::IoError(format!("Failed to write snapshot: {}", e)))?;
            writer
                .flush()
                .map_err(|e| StorageError::IoError(format!("Failed to flush snapshot: {}", e)))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| StorageError::IoError(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| StorageError::IoError(format!("Failed to rename snapshot: {}", e)))?;
        Ok(())
    }

    pub fn load(&self) -> StorageResult<Option<StoreSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.snapshot_path)
            .map_err(|e| StorageError::IoError(format!("Failed to open snapshot: {}", e)))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| StorageError::IoError(format!("Failed to read snapshot: {}", e)))?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| StorageError::Serialization(format!("Failed to deserialize snapshot: {}", e)))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorageError::Serialization(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldType, NewFieldDefinition, NewFieldValue, RecordId, Value};
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_save_and_load() {
        let dir = TempDir::new().unwrap();
        let manager = SnapshotManager::new(dir.path().join("nested").join("store.snapshot"));
        assert!(manager.load().unwrap().is_none());

        let mut tables = Tables::default();
        let def = tables
            .definitions
            .insert(NewFieldDefinition {
                model_type: "Review".into(),
                field_name: "rating".into(),
                value_type: FieldType::Number,
            })
            .unwrap();
        tables
            .values
            .insert(NewFieldValue {
                field_id: def.id,
                record_id: RecordId(1),
                value: Value::Number(5),
            })
            .unwrap();

        manager.save(&StoreSnapshot::new(tables)).unwrap();
        assert!(manager.exists());

        let loaded = manager.load().unwrap().unwrap();
        assert_eq!(loaded.metadata.definition_count, 1);
        assert_eq!(loaded.metadata.value_count, 1);
        let row = loaded.tables.values.find(def.id, RecordId(1)).unwrap();
        assert_eq!(row.value(), Some(Value::Number(5)));
    }

    #[test]
    fn test_corrupt_snapshot_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.snapshot");
        fs::write(&path, b"not a snapshot").unwrap();

        let err = SnapshotManager::new(&path).load().unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
