//! Core domain library for pasteward (storage, identifiers, abuse control).

/// Abuse control: subnet reputation and address normalization.
pub mod abuse;
/// Administrative commands.
pub mod admin;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Key-value storage and the paste repository.
pub mod db;
/// Line diffs between pastes.
pub mod diff;
/// Application error types (storage/domain).
pub mod error;
/// Paste identifier allocation.
pub mod ids;
/// Data models for submissions and persistence.
pub mod models;
/// Submission field validation.
pub mod sanity;

pub use config::Config;
pub use constants::*;
pub use db::{KvStore, MemoryStore, PasteRepository, RedbStore};
pub use error::AppError;
