//! Redb backend: a pure-Rust embedded key-value store with ACID
//! transactions. `batch_put` maps onto a single write transaction, which
//! is what gives the check commit its all-or-nothing guarantee on disk.

use ::redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

use super::StoreBackend;
use crate::StoreError;

const ROWS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("simcheck_rows");

/// Persistent backend over a single redb database file.
///
/// The `Arc<Database>` wrapper allows sharing across threads; redb handles
/// its own locking and MVCC internally.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create a database at `path` and ensure the row table
    /// exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(StoreError::backend)?;

        let write_txn = db.begin_write().map_err(StoreError::backend)?;
        {
            // Opening the table creates it on first use.
            let _table = write_txn.open_table(ROWS_TABLE).map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl StoreBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.batch_put(vec![(key.to_string(), value.to_vec())])
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn.open_table(ROWS_TABLE).map_err(StoreError::backend)?;
        match table.get(key).map_err(StoreError::backend)? {
            Some(value) => Ok(Some(value.value().to_vec())),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn.open_table(ROWS_TABLE).map_err(StoreError::backend)?;
            table.remove(key).map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn.open_table(ROWS_TABLE).map_err(StoreError::backend)?;
            for (key, value) in entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(StoreError::backend)?;
            }
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn.open_table(ROWS_TABLE).map_err(StoreError::backend)?;
        for item in table.range(prefix..).map_err(StoreError::backend)? {
            let (key, value) = item.map_err(StoreError::backend)?;
            if !key.value().starts_with(prefix) {
                break;
            }
            visitor(key.value(), value.value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(file.path()).unwrap();

        backend.put("key1", b"value1").unwrap();
        assert_eq!(backend.get("key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(backend.get("missing").unwrap(), None);

        backend.delete("key1").unwrap();
        assert_eq!(backend.get("key1").unwrap(), None);
    }

    #[test]
    fn batch_put_is_visible_after_commit() {
        let file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(file.path()).unwrap();

        backend
            .batch_put(vec![
                ("a:1".to_string(), b"1".to_vec()),
                ("a:2".to_string(), b"2".to_vec()),
                ("b:1".to_string(), b"3".to_vec()),
            ])
            .unwrap();

        let mut keys = Vec::new();
        backend
            .scan_prefix("a:", &mut |key, _| {
                keys.push(key.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(keys, vec!["a:1".to_string(), "a:2".to_string()]);
    }
}
