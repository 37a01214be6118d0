//! In-process key-value store.

use super::time_util::{expiry_from, system_clock, Clock, StoredEntry};
use super::KvStore;
use crate::error::AppError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// [`KvStore`] kept in a mutex-guarded map. Contents vanish with the process.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
    clock: Clock,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Create an empty store with an explicit clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of physically stored entries, expired ones included.
    pub fn raw_len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredEntry>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::Storage("Memory store lock poisoned".to_string()))
    }

    fn now(&self) -> u64 {
        (self.clock)()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let now = self.now();
        let entries = self.lock()?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), AppError> {
        let entry = StoredEntry::new(value, self.now(), ttl);
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }

    fn set_nx_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, AppError> {
        let now = self.now();
        let mut entries = self.lock()?;
        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }
        entries.insert(key.to_string(), StoredEntry::new(value, now, ttl));
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool, AppError> {
        let now = self.now();
        Ok(self
            .lock()?
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, AppError> {
        let now = self.now();
        let mut entries = self.lock()?;
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = expiry_from(now, ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn purge_expired(&self) -> Result<usize, AppError> {
        let now = self.now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(before - entries.len())
    }
}
