//! Paste repository: JSON records under `paste:<id>` with store-managed expiry.

use super::KvStore;
use crate::diff::{diff_lines, DiffTable};
use crate::error::AppError;
use crate::ids::{self, paste_key, TrustLevel, Visibility};
use crate::models::paste::{ForkDraft, Paste};
use std::sync::Arc;
use std::time::Duration;

/// Accessor for paste records.
#[derive(Clone)]
pub struct PasteRepository {
    store: Arc<dyn KvStore>,
}

impl PasteRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Underlying store, shared with abuse control.
    pub fn store(&self) -> Arc<dyn KvStore> {
        self.store.clone()
    }

    /// Write `paste` under an explicit id, replacing whatever was there.
    ///
    /// Fresh submissions go through [`PasteRepository::create`] instead.
    ///
    /// # Errors
    /// Returns an error when encoding or the store write fails.
    pub fn put(&self, id: &str, paste: &Paste, ttl: Duration) -> Result<(), AppError> {
        let encoded = serde_json::to_vec(paste)?;
        self.store.set_ex(&paste_key(id), &encoded, ttl)
    }

    /// Store `paste` under a newly allocated identifier.
    ///
    /// # Returns
    /// The identifier the paste is reachable under.
    ///
    /// # Errors
    /// Returns an error when encoding, allocation or the store write fails.
    pub fn create(
        &self,
        paste: &Paste,
        visibility: Visibility,
        trust: TrustLevel,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let encoded = serde_json::to_vec(paste)?;
        let id = ids::allocate(self.store.as_ref(), visibility, trust, &encoded, ttl)?;
        tracing::info!(paste_id = %id, ?visibility, ?trust, "Stored paste");
        Ok(id)
    }

    /// Fetch a paste by id.
    ///
    /// # Returns
    /// `Ok(None)` when the id is unknown, expired, or malformed.
    ///
    /// # Errors
    /// Returns an error when store access or decoding fails.
    pub fn get(&self, id: &str) -> Result<Option<Paste>, AppError> {
        if !ids::is_valid_id(id) {
            return Ok(None);
        }
        match self.store.get(&paste_key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, id: &str) -> Result<bool, AppError> {
        if !ids::is_valid_id(id) {
            return Ok(false);
        }
        self.store.exists(&paste_key(id))
    }

    /// Delete a paste by id.
    ///
    /// # Returns
    /// `true` if a record existed.
    pub fn delete(&self, id: &str) -> Result<bool, AppError> {
        if !ids::is_valid_id(id) {
            return Ok(false);
        }
        let deleted = self.store.delete(&paste_key(id))?;
        if deleted {
            tracing::info!(paste_id = %id, "Deleted paste");
        }
        Ok(deleted)
    }

    /// Resolve the paste `id` was forked from, one level up.
    ///
    /// # Returns
    /// `Ok(None)` when `id` is missing, has no parent, or the parent expired.
    pub fn resolve_fork_lineage(&self, id: &str) -> Result<Option<(String, Paste)>, AppError> {
        let Some(paste) = self.get(id)? else {
            return Ok(None);
        };
        let Some(parent_id) = paste.forked_from else {
            return Ok(None);
        };
        Ok(self.get(&parent_id)?.map(|parent| (parent_id, parent)))
    }

    /// Pre-filled form for forking `parent_id`.
    pub fn fork_draft(&self, parent_id: &str) -> Result<Option<ForkDraft>, AppError> {
        Ok(self
            .get(parent_id)?
            .map(|parent| ForkDraft::from_parent(parent_id, parent)))
    }

    /// Line diff between two stored pastes, `orig` on the left.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] if either id does not resolve.
    pub fn diff(&self, orig: &str, fork: &str) -> Result<DiffTable, AppError> {
        let left = self.get(orig)?.ok_or(AppError::NotFound)?;
        let right = self.get(fork)?.ok_or(AppError::NotFound)?;
        Ok(diff_lines(orig, &left.code, fork, &right.code))
    }
}
