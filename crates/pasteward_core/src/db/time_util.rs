//! Expiry envelope and clock helpers shared by store implementations.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of "now" in unix seconds.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Clock backed by the system time.
pub fn system_clock() -> Clock {
    Arc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0)
    })
}

/// A stored value together with its absolute expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Unix seconds after which the entry no longer exists.
    pub expires_at: u64,
    pub value: Vec<u8>,
}

impl StoredEntry {
    pub fn new(value: &[u8], now: u64, ttl: Duration) -> Self {
        Self {
            expires_at: expiry_from(now, ttl),
            value: value.to_vec(),
        }
    }

    pub fn is_live(&self, now: u64) -> bool {
        now < self.expires_at
    }

    pub fn encode(&self) -> Result<Vec<u8>, AppError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, AppError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

pub(crate) fn expiry_from(now: u64, ttl: Duration) -> u64 {
    now.saturating_add(ttl.as_secs())
}
