//! HTTP request handlers and extractors.

/// Administrative command endpoint.
pub mod admin;
pub(crate) mod extract;
/// Paste endpoints.
pub mod paste;
