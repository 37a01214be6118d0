//! Key-value storage and the paste repository.
//!
//! Everything shared between requests lives behind [`KvStore`]: pastes,
//! blacklist and greylist entries. Stores provide atomic single-key
//! operations with per-key expiry and nothing more.

/// In-memory store.
pub mod memory;
/// Paste repository on top of a [`KvStore`].
pub mod paste;
/// redb-backed persistent store.
pub mod redb_store;
/// redb table definitions.
pub mod tables;
/// Expiry envelope and clock helpers.
pub mod time_util;

pub use memory::MemoryStore;
pub use paste::PasteRepository;
pub use redb_store::RedbStore;
pub use time_util::{system_clock, Clock};

use crate::error::AppError;
use std::time::Duration;

/// TTL-capable key-value store addressed by string keys.
///
/// Expired entries behave exactly like missing ones for every operation.
pub trait KvStore: Send + Sync {
    /// Fetch the live value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), AppError>;

    /// Store `value` under `key` only if no live entry exists.
    ///
    /// # Returns
    /// `true` when the value was written, `false` when the key was taken.
    fn set_nx_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, AppError>;

    /// Whether a live entry exists under `key`.
    fn exists(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.get(key)?.is_some())
    }

    /// Remove `key`.
    ///
    /// # Returns
    /// `true` if a live entry was removed.
    fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Reset the expiry of a live entry to `ttl` from now.
    ///
    /// # Returns
    /// `true` if the key existed.
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, AppError>;

    /// Physically drop expired entries.
    ///
    /// # Returns
    /// Number of entries removed.
    fn purge_expired(&self) -> Result<usize, AppError>;
}
