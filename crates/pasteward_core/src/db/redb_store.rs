//! Persistent key-value store backed by redb.

use super::tables::KV;
use super::time_util::{expiry_from, system_clock, Clock, StoredEntry};
use super::KvStore;
use crate::error::AppError;
use redb::{ReadableDatabase, ReadableTable};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// [`KvStore`] persisted in a single redb file.
///
/// Expiry is tracked per entry; reads filter expired rows and
/// [`KvStore::purge_expired`] reclaims them. Every mutating operation runs in
/// its own write transaction, which makes `set_nx_ex` atomic.
pub struct RedbStore {
    db: Arc<redb::Database>,
    clock: Clock,
}

impl RedbStore {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    /// Returns an error if redb cannot open the file or create the table.
    pub fn open(path: &str) -> Result<Self, AppError> {
        Self::open_with_clock(path, system_clock())
    }

    /// Open the store with an explicit clock.
    ///
    /// # Errors
    /// Returns an error if redb cannot open the file or create the table.
    pub fn open_with_clock(path: &str, clock: Clock) -> Result<Self, AppError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    AppError::Storage(format!(
                        "Failed to create data directory '{}': {}",
                        parent.display(),
                        err
                    ))
                })?;
            }
        }

        let db = redb::Database::create(path)?;
        let write_txn = db.begin_write()?;
        write_txn.open_table(KV)?;
        write_txn.commit()?;
        Ok(Self {
            db: Arc::new(db),
            clock,
        })
    }

    fn now(&self) -> u64 {
        (self.clock)()
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let now = self.now();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KV)?;
        let Some(guard) = table.get(key)? else {
            return Ok(None);
        };
        let entry = StoredEntry::decode(guard.value())?;
        Ok(entry.is_live(now).then_some(entry.value))
    }

    fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), AppError> {
        let encoded = StoredEntry::new(value, self.now(), ttl).encode()?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV)?;
            table.insert(key, encoded.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn set_nx_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, AppError> {
        let now = self.now();
        let encoded = StoredEntry::new(value, now, ttl).encode()?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV)?;
            let taken = match table.get(key)? {
                Some(guard) => StoredEntry::decode(guard.value())?.is_live(now),
                None => false,
            };
            if taken {
                return Ok(false);
            }
            table.insert(key, encoded.as_slice())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool, AppError> {
        let now = self.now();
        let write_txn = self.db.begin_write()?;
        let mut existed = false;
        {
            let mut table = write_txn.open_table(KV)?;
            if let Some(guard) = table.remove(key)? {
                existed = StoredEntry::decode(guard.value())?.is_live(now);
            };
        }
        write_txn.commit()?;
        Ok(existed)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, AppError> {
        let now = self.now();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV)?;
            let entry = match table.get(key)? {
                Some(guard) => Some(StoredEntry::decode(guard.value())?),
                None => None,
            };
            let Some(mut entry) = entry.filter(|entry| entry.is_live(now)) else {
                return Ok(false);
            };
            entry.expires_at = expiry_from(now, ttl);
            let encoded = entry.encode()?;
            table.insert(key, encoded.as_slice())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    fn purge_expired(&self) -> Result<usize, AppError> {
        let now = self.now();
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(KV)?;
            let mut expired = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                match StoredEntry::decode(value.value()) {
                    Ok(entry) if entry.is_live(now) => {}
                    Ok(_) => expired.push(key.value().to_string()),
                    Err(err) => {
                        tracing::warn!("Dropping undecodable entry '{}': {}", key.value(), err);
                        expired.push(key.value().to_string());
                    }
                }
            }
            for key in &expired {
                let _ = table.remove(key.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
