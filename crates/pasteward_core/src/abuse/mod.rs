//! Abuse control: per-subnet blacklist and greylist.
//!
//! Submitter addresses are never stored. An address is first widened to its
//! routed prefix by a [`SubnetResolver`], then the prefix is hashed with
//! SHA-512 and the digest becomes the store key. Two independent flags live
//! under that digest:
//!
//! - `ipblock:<digest>`: submissions are rejected.
//! - `ipgrey:<digest>`: submissions are accepted but not relayed.
//!
//! Whitelisting deletes both. Both expire after four days.
//!
//! When the resolver fails no judgment is possible and every check answers
//! "not listed" (fail open); mutating commands report failure instead.

/// Team Cymru WHOIS resolver.
pub mod cymru;

pub use cymru::CymruResolver;

use crate::constants::{BLACKLIST_KEY_PREFIX, GREYLIST_KEY_PREFIX, REPUTATION_TTL_SECS};
use crate::db::KvStore;
use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha512};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Sentinel stored under reputation keys; only presence matters.
const FLAG_VALUE: &[u8] = b"nil";

/// Maps a single address to the network prefix it is routed under.
#[async_trait]
pub trait SubnetResolver: Send + Sync {
    /// # Errors
    /// Returns an error when the prefix cannot be determined.
    async fn resolve(&self, addr: &str) -> Result<String, AppError>;
}

/// Resolver that derives the prefix locally: `/24` for IPv4, `/48` for IPv6.
///
/// Used where no WHOIS service is reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPrefixResolver;

#[async_trait]
impl SubnetResolver for LocalPrefixResolver {
    async fn resolve(&self, addr: &str) -> Result<String, AppError> {
        let ip: IpAddr = addr
            .trim()
            .parse()
            .map_err(|_| AppError::Upstream(format!("Not an IP address: '{}'", addr)))?;
        Ok(match ip {
            IpAddr::V4(v4) => {
                let [a, b, c, _] = v4.octets();
                format!("{}.{}.{}.0/24", a, b, c)
            }
            IpAddr::V6(v6) => {
                let s = v6.segments();
                format!("{:x}:{:x}:{:x}::/48", s[0], s[1], s[2])
            }
        })
    }
}

/// Hashed subnet used as the reputation key suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubnetKey(String);

impl SubnetKey {
    /// Hash a routed prefix such as `192.0.2.0/24`.
    pub fn from_prefix(prefix: &str) -> Self {
        Self(hex::encode(Sha512::digest(prefix.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn blacklist_key(&self) -> String {
        format!("{}{}", BLACKLIST_KEY_PREFIX, self.0)
    }

    fn greylist_key(&self) -> String {
        format!("{}{}", GREYLIST_KEY_PREFIX, self.0)
    }
}

/// Standing of a subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reputation {
    Clean,
    Greylisted,
    Blacklisted,
}

/// Blacklist/greylist bookkeeping on top of the shared store.
#[derive(Clone)]
pub struct AbuseControl {
    store: Arc<dyn KvStore>,
    resolver: Arc<dyn SubnetResolver>,
    ttl: Duration,
}

impl AbuseControl {
    pub fn new(store: Arc<dyn KvStore>, resolver: Arc<dyn SubnetResolver>) -> Self {
        Self {
            store,
            resolver,
            ttl: Duration::from_secs(REPUTATION_TTL_SECS),
        }
    }

    /// Resolve and hash the subnet of `addr`.
    ///
    /// # Returns
    /// `None` when the resolver fails; callers must not judge the address.
    pub async fn subnet_key(&self, addr: &str) -> Option<SubnetKey> {
        match self.resolver.resolve(addr).await {
            Ok(prefix) => Some(SubnetKey::from_prefix(&prefix)),
            Err(err) => {
                tracing::warn!("Subnet lookup failed; skipping reputation check: {}", err);
                None
            }
        }
    }

    /// Whether `addr` belongs to a blacklisted subnet. Fails open.
    ///
    /// # Errors
    /// Returns an error only when the store itself fails.
    pub async fn is_blacklisted(&self, addr: &str) -> Result<bool, AppError> {
        match self.subnet_key(addr).await {
            Some(key) => self.store.exists(&key.blacklist_key()),
            None => Ok(false),
        }
    }

    /// Whether `addr` belongs to a greylisted subnet. Fails open.
    pub async fn is_greylisted(&self, addr: &str) -> Result<bool, AppError> {
        match self.subnet_key(addr).await {
            Some(key) => self.store.exists(&key.greylist_key()),
            None => Ok(false),
        }
    }

    /// Combined standing of `addr`; blacklisting wins over greylisting.
    pub async fn reputation(&self, addr: &str) -> Result<Reputation, AppError> {
        let Some(key) = self.subnet_key(addr).await else {
            return Ok(Reputation::Clean);
        };
        self.reputation_of(&key)
    }

    /// Standing of an already-resolved subnet.
    pub fn reputation_of(&self, key: &SubnetKey) -> Result<Reputation, AppError> {
        if self.store.exists(&key.blacklist_key())? {
            Ok(Reputation::Blacklisted)
        } else if self.store.exists(&key.greylist_key())? {
            Ok(Reputation::Greylisted)
        } else {
            Ok(Reputation::Clean)
        }
    }

    pub fn mark_blacklisted(&self, key: &SubnetKey) -> Result<(), AppError> {
        self.store.set_ex(&key.blacklist_key(), FLAG_VALUE, self.ttl)?;
        tracing::info!(subnet = %short(key), "Subnet blacklisted");
        Ok(())
    }

    pub fn mark_greylisted(&self, key: &SubnetKey) -> Result<(), AppError> {
        self.store.set_ex(&key.greylist_key(), FLAG_VALUE, self.ttl)?;
        tracing::info!(subnet = %short(key), "Subnet greylisted");
        Ok(())
    }

    /// Clear both flags. Idempotent.
    pub fn clear(&self, key: &SubnetKey) -> Result<(), AppError> {
        self.store.delete(&key.blacklist_key())?;
        self.store.delete(&key.greylist_key())?;
        tracing::info!(subnet = %short(key), "Subnet whitelisted");
        Ok(())
    }

    /// Blacklist the subnet of `addr`.
    ///
    /// # Returns
    /// `false` when the subnet could not be resolved and nothing changed.
    pub async fn blacklist(&self, addr: &str) -> Result<bool, AppError> {
        match self.subnet_key(addr).await {
            Some(key) => self.mark_blacklisted(&key).map(|_| true),
            None => Ok(false),
        }
    }

    /// Greylist the subnet of `addr`.
    ///
    /// # Returns
    /// `false` when the subnet could not be resolved and nothing changed.
    pub async fn greylist(&self, addr: &str) -> Result<bool, AppError> {
        match self.subnet_key(addr).await {
            Some(key) => self.mark_greylisted(&key).map(|_| true),
            None => Ok(false),
        }
    }

    /// Return the subnet of `addr` to the clean state.
    ///
    /// # Returns
    /// `false` when the subnet could not be resolved and nothing changed.
    pub async fn whitelist(&self, addr: &str) -> Result<bool, AppError> {
        match self.subnet_key(addr).await {
            Some(key) => self.clear(&key).map(|_| true),
            None => Ok(false),
        }
    }
}

/// Digest prefix for logs; full digests are noise.
fn short(key: &SubnetKey) -> &str {
    &key.as_str()[..12]
}
