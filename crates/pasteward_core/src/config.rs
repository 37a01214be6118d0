//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_MAX_PASTE_SIZE, DEFAULT_PASTE_TTL_SECS, DEFAULT_PORT, DEFAULT_UPSTREAM_TIMEOUT_MS,
    DEFAULT_WHOIS_SERVER,
};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Relay (chat notification) settings.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub enabled: bool,
    pub host: Option<String>,
    pub port: u16,
    pub password: String,
    /// Channels that only hear about public pastes.
    pub channels: Vec<String>,
    /// Channels that hear about every paste.
    pub admin_channels: Vec<String>,
}

impl RelayConfig {
    /// Whether there is enough configuration to reach a relay at all.
    pub fn is_usable(&self) -> bool {
        self.enabled && self.host.is_some()
    }
}

/// Captcha verification settings.
#[derive(Debug, Clone, Default)]
pub struct SpamConfig {
    pub check_spam: bool,
    pub recaptcha_secret: Option<String>,
    pub recaptcha_sitekey: Option<String>,
}

/// Runtime configuration for pasteward.
///
/// Built once at startup and shared read-only with every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub port: u16,
    pub max_paste_size: usize,
    pub paste_ttl_secs: u64,
    /// Base URL pastes are published under, always ending in `/`.
    pub public_url: String,
    pub admin_key: Option<String>,
    /// Take the submitter address from `X-Forwarded-For` (behind a proxy).
    pub trust_forwarded_for: bool,
    pub whois_server: String,
    pub upstream_timeout_ms: u64,
    pub spam: SpamConfig,
    pub relay: RelayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            port: DEFAULT_PORT,
            max_paste_size: DEFAULT_MAX_PASTE_SIZE,
            paste_ttl_secs: DEFAULT_PASTE_TTL_SECS,
            public_url: normalize_public_url(format!("http://localhost:{}", DEFAULT_PORT)),
            admin_key: None,
            trust_forwarded_for: false,
            whois_server: DEFAULT_WHOIS_SERVER.to_string(),
            upstream_timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
            spam: SpamConfig::default(),
            relay: RelayConfig {
                enabled: true,
                ..RelayConfig::default()
            },
        }
    }
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    std::env::current_dir().ok()
}

fn default_db_path() -> String {
    let home = resolve_home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".cache")
        .join("pasteward")
        .join("pastes.redb")
        .to_string_lossy()
        .to_string()
}

fn normalize_public_url(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Parse a boolean-like value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`, `t`, `y`
/// - Falsy: `0`, `false`, `no`, `off`, `f`, `n`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" | "t" | "y" => Some(true),
        "" | "0" | "false" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

/// Interpret a form value as a boolean; anything unrecognized is `false`.
pub fn str2bool(value: &str) -> bool {
    parse_env_flag(value).unwrap_or(false)
}

/// Read a boolean flag from the environment, falling back to `default`
/// when the variable is missing or unrecognized.
pub fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(default)
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env_flag(name, false)
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|value| value.parse().ok())
}

/// Split a comma-separated channel list, dropping blanks.
pub fn parse_channel_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|channel| !channel.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let port = env_parsed("PORT").unwrap_or(defaults.port);
        Self {
            db_path: env_string("DB_PATH")
                .map(expand_tilde)
                .unwrap_or(defaults.db_path),
            port,
            max_paste_size: env_parsed("MAX_PASTE_SIZE").unwrap_or(defaults.max_paste_size),
            paste_ttl_secs: env_parsed("PASTE_TTL_SECS").unwrap_or(defaults.paste_ttl_secs),
            public_url: normalize_public_url(
                env_string("PUBLIC_URL")
                    .unwrap_or_else(|| format!("http://localhost:{}", port)),
            ),
            admin_key: env_string("ADMIN_KEY"),
            trust_forwarded_for: env_flag_enabled("TRUST_FORWARDED_FOR"),
            whois_server: env_string("WHOIS_SERVER").unwrap_or(defaults.whois_server),
            upstream_timeout_ms: env_parsed("UPSTREAM_TIMEOUT_MS")
                .unwrap_or(defaults.upstream_timeout_ms),
            spam: SpamConfig {
                check_spam: env_flag_enabled("CHECK_SPAM"),
                recaptcha_secret: env_string("RECAPTCHA_SECRET"),
                recaptcha_sitekey: env_string("RECAPTCHA_SITEKEY"),
            },
            relay: RelayConfig {
                enabled: env_flag("RELAY_ENABLED", true),
                host: env_string("RELAY_HOST"),
                port: env_parsed("RELAY_PORT").unwrap_or(12345),
                password: env_string("RELAY_PASS").unwrap_or_default(),
                channels: env_string("RELAY_CHAN")
                    .map(|value| parse_channel_list(&value))
                    .unwrap_or_default(),
                admin_channels: env_string("RELAY_ADMIN_CHAN")
                    .map(|value| parse_channel_list(&value))
                    .unwrap_or_default(),
            },
        }
    }

    /// Timeout applied to captcha, WHOIS and relay I/O.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// Absolute URL for a paste id.
    pub fn paste_url(&self, id: &str) -> String {
        format!("{}{}", self.public_url, id)
    }
}
