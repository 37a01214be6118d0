//! Paste identifier allocation.
//!
//! Identifiers are random bytes rendered as lowercase hex. Easy-to-type
//! public pastes start at a single byte; private pastes and submissions
//! without a captcha answer start longer. Uniqueness is settled by the
//! store's conditional write: on conflict the length grows by one byte and a
//! fresh id is drawn, so an existing record is never overwritten.

use crate::constants::{PASTE_KEY_PREFIX, PRIVATE_ID_BYTES, PUBLIC_ID_BYTES, UNVERIFIED_ID_BYTES};
use crate::db::KvStore;
use crate::error::AppError;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Who may see a paste in listings and relay channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Whether the submitter proved interaction (answered a captcha).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Verified,
    Unverified,
}

/// Number of random bytes the first candidate id uses.
pub fn starting_length(visibility: Visibility, trust: TrustLevel) -> usize {
    match (trust, visibility) {
        (TrustLevel::Unverified, _) => UNVERIFIED_ID_BYTES,
        (TrustLevel::Verified, Visibility::Private) => PRIVATE_ID_BYTES,
        (TrustLevel::Verified, Visibility::Public) => PUBLIC_ID_BYTES,
    }
}

/// Store key for a paste id.
pub fn paste_key(id: &str) -> String {
    format!("{}{}", PASTE_KEY_PREFIX, id)
}

/// Whether `id` could have been produced by this allocator.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() % 2 == 0
        && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Draw `len` bytes from the OS CSPRNG and hex-encode them.
///
/// # Errors
/// Returns [`AppError::Internal`] when the random source fails.
pub fn random_id(len: usize) -> Result<String, AppError> {
    let mut bytes = vec![0u8; len];
    OsRng.try_fill_bytes(&mut bytes).map_err(|err| {
        tracing::error!("OS random source failed: {}", err);
        AppError::Internal
    })?;
    Ok(hex::encode(bytes))
}

/// Draw candidate ids starting at `start_len` bytes until `claim` accepts one.
///
/// `claim` must atomically reserve the id and return `false` when it is
/// already taken; each refusal grows the next candidate by one byte.
///
/// # Errors
/// Propagates errors from the random source or from `claim`.
pub fn allocate_with<F>(start_len: usize, mut claim: F) -> Result<String, AppError>
where
    F: FnMut(&str) -> Result<bool, AppError>,
{
    let mut len = start_len.max(1);
    loop {
        let candidate = random_id(len)?;
        if claim(&candidate)? {
            return Ok(candidate);
        }
        tracing::debug!("Paste id collision at {} bytes; growing", len);
        len += 1;
    }
}

/// Allocate a fresh id and write `value` under it in one conditional write.
///
/// # Returns
/// The identifier the value was stored under.
///
/// # Errors
/// Propagates store and random-source failures.
pub fn allocate(
    store: &dyn KvStore,
    visibility: Visibility,
    trust: TrustLevel,
    value: &[u8],
    ttl: Duration,
) -> Result<String, AppError> {
    allocate_with(starting_length(visibility, trust), |candidate| {
        store.set_nx_ex(&paste_key(candidate), value, ttl)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn starting_length_follows_visibility_and_trust() {
        assert_eq!(starting_length(Visibility::Public, TrustLevel::Verified), 1);
        assert_eq!(starting_length(Visibility::Private, TrustLevel::Verified), 8);
        assert_eq!(starting_length(Visibility::Public, TrustLevel::Unverified), 12);
        assert_eq!(starting_length(Visibility::Private, TrustLevel::Unverified), 12);
    }

    #[test]
    fn random_id_is_lowercase_hex_of_requested_length() {
        let id = random_id(8).expect("id");
        assert_eq!(id.len(), 16);
        assert!(is_valid_id(&id));
    }

    #[test]
    fn is_valid_id_rejects_foreign_shapes() {
        for id in ["", "a", "AB", "zz", "ab/cd", "../"] {
            assert!(!is_valid_id(id), "id: {}", id);
        }
        assert!(is_valid_id("0f"));
    }

    #[test]
    fn allocate_with_grows_length_after_each_refusal() {
        let mut seen = Vec::new();
        let id = allocate_with(1, |candidate| {
            seen.push(candidate.len());
            Ok(seen.len() == 3)
        })
        .expect("allocate");
        assert_eq!(seen, vec![2, 4, 6]);
        assert_eq!(id.len(), 6);
    }

    #[test]
    fn allocate_never_overwrites_existing_records() {
        let store = MemoryStore::new();
        // Fill the whole one-byte space so every public id must grow.
        for byte in 0..=255u8 {
            store
                .set_ex(&paste_key(&hex::encode([byte])), b"taken", TTL)
                .expect("seed");
        }
        let id = allocate(&store, Visibility::Public, TrustLevel::Verified, b"new", TTL)
            .expect("allocate");
        assert!(id.len() >= 4);
        for byte in 0..=255u8 {
            let key = paste_key(&hex::encode([byte]));
            assert_eq!(store.get(&key).expect("get").as_deref(), Some(&b"taken"[..]));
        }
        assert_eq!(
            store.get(&paste_key(&id)).expect("get").as_deref(),
            Some(&b"new"[..])
        );
    }

    #[test]
    fn concurrent_allocations_are_pairwise_distinct() {
        let store = Arc::new(MemoryStore::new());
        let workers = 64;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|n| {
                let store = store.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let value = format!("worker-{}", n);
                    let id = allocate(
                        store.as_ref(),
                        Visibility::Public,
                        TrustLevel::Verified,
                        value.as_bytes(),
                        TTL,
                    )
                    .expect("allocate");
                    (id, value)
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            let (id, value) = handle.join().expect("join");
            // Each worker must still find its own value: nothing was overwritten.
            assert_eq!(
                store.get(&paste_key(&id)).expect("get"),
                Some(value.into_bytes())
            );
            assert!(ids.insert(id), "duplicate id allocated");
        }
        assert_eq!(ids.len(), workers);
    }

    #[test]
    fn public_ids_are_shorter_than_private_ids_on_average() {
        let store = MemoryStore::new();
        let samples = 50;
        let mut public_total = 0usize;
        let mut private_total = 0usize;
        for _ in 0..samples {
            public_total += allocate(&store, Visibility::Public, TrustLevel::Verified, b"p", TTL)
                .expect("public")
                .len();
            private_total +=
                allocate(&store, Visibility::Private, TrustLevel::Verified, b"q", TTL)
                    .expect("private")
                    .len();
        }
        assert!(public_total < private_total);
    }
}
