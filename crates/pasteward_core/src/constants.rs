//! Shared constants used across pasteward crates.

/// Default API port.
pub const DEFAULT_PORT: u16 = 38411;

/// Default maximum submission size accepted by the HTTP layer.
pub const DEFAULT_MAX_PASTE_SIZE: usize = 1024 * 1024;

/// Lifetime of a stored paste, in seconds (4 days).
pub const DEFAULT_PASTE_TTL_SECS: u64 = 345_600;

/// Lifetime of a blacklist/greylist entry, in seconds (4 days).
pub const REPUTATION_TTL_SECS: u64 = 345_600;

/// Shortest accepted client-chosen TTL, in minutes.
pub const MIN_CLIENT_TTL_MINUTES: u64 = 30;
/// Longest accepted client-chosen TTL, in minutes (4 weeks).
pub const MAX_CLIENT_TTL_MINUTES: u64 = 40_320;

/// Identifier length in bytes for trusted public pastes.
pub const PUBLIC_ID_BYTES: usize = 1;
/// Identifier length in bytes for trusted private pastes.
pub const PRIVATE_ID_BYTES: usize = 8;
/// Identifier length in bytes for submissions without a captcha answer.
pub const UNVERIFIED_ID_BYTES: usize = 12;

/// Store key prefix for paste records.
pub const PASTE_KEY_PREFIX: &str = "paste:";
/// Store key prefix for blacklisted subnets.
pub const BLACKLIST_KEY_PREFIX: &str = "ipblock:";
/// Store key prefix for greylisted subnets.
pub const GREYLIST_KEY_PREFIX: &str = "ipgrey:";

/// Default Team Cymru WHOIS endpoint used for subnet resolution.
pub const DEFAULT_WHOIS_SERVER: &str = "whois.cymru.com:43";

/// Default timeout for outbound captcha, WHOIS, and relay calls.
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 5_000;

/// Default base URL for CLI/API clients.
pub const DEFAULT_CLI_SERVER_URL: &str = "http://localhost:38411";
