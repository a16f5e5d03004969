use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use siteplan_shared::models::AnnotationSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

const ANNOTATION_SETS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("annotation_sets");

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Corrupt record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Cannot stat {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct Storage {
    db: Database,
    path: PathBuf,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, StorageError> {
        let db = Database::create(path)?;

        // Ensure table exists
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ANNOTATION_SETS_TABLE)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened annotation store");
        Ok(Arc::new(Storage {
            db,
            path: path.to_path_buf(),
        }))
    }

    pub fn save(&self, set: &AnnotationSet) -> Result<(), StorageError> {
        let json = serde_json::to_vec(set)?;
        let id_str = set.id.to_string();

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ANNOTATION_SETS_TABLE)?;
            table.insert(id_str.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        tracing::debug!(id = %set.id, features = set.feature_count, "Saved annotation set");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<AnnotationSet>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ANNOTATION_SETS_TABLE)?;

        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Every stored set, newest first.
    pub fn list(&self) -> Result<Vec<AnnotationSet>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ANNOTATION_SETS_TABLE)?;
        let mut sets = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            sets.push(serde_json::from_slice::<AnnotationSet>(value.value())?);
        }
        sets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sets)
    }

    pub fn count(&self) -> Result<u64, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ANNOTATION_SETS_TABLE)?;
        Ok(table.len()?)
    }

    pub fn db_size_bytes(&self) -> Result<u64, StorageError> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|source| StorageError::Io {
                path: self.path.clone(),
                source,
            })
    }

    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ANNOTATION_SETS_TABLE)?;
            let result = table.remove(id)?;
            result.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
