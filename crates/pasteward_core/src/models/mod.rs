//! Data models for the pasteward API and persistence layer.

/// Paste models and request types.
pub mod paste;

#[cfg(test)]
mod tests;
