//! Administrative commands: paste removal and subnet reputation changes.
//!
//! Every request carries a shared-secret token that must match the configured
//! admin key exactly. Nothing runs until [`preflight`] accepts the request.

use crate::abuse::AbuseControl;
use crate::db::PasteRepository;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const MSG_NO_ADMIN_KEY: &str = "No admin key configured.";
pub const MSG_NO_PAYLOAD: &str = "No payload decoded.";
pub const MSG_NO_AUTH: &str = "No auth provided.";
pub const MSG_INVALID_AUTH: &str = "Invalid auth.";
pub const MSG_NO_COMMAND: &str = "No command provided.";
pub const MSG_UNSUPPORTED: &str = "Command not supported.";
pub const MSG_NO_PASTE: &str = "No paste provided.";
pub const MSG_NO_ADDRESS: &str = "No address provided.";
pub const MSG_PASTE_NOT_FOUND: &str = "Paste not found.";
pub const MSG_UNRESOLVED: &str = "Could not resolve the submitter subnet.";
pub const MSG_PARTIAL_BLACKLIST: &str = "Paste removed, but the blacklist entry could not be written.";

/// Commands understood by the admin endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Delete a paste and blacklist the subnet it was submitted from.
    BlacklistPaste,
    /// Delete a paste without touching reputation.
    DeletePaste,
    /// Clear both reputation flags for an address.
    WhitelistAddress,
    /// Suppress relay notifications for the subnet a paste came from.
    GreylistAddress,
}

impl AdminCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlacklistPaste => "blacklist_paste",
            Self::DeletePaste => "delete_paste",
            Self::WhitelistAddress => "whitelist_address",
            Self::GreylistAddress => "greylist_address",
        }
    }

    /// Whether the target names a paste (as opposed to an address).
    pub fn targets_paste(self) -> bool {
        !matches!(self, Self::WhitelistAddress)
    }
}

impl FromStr for AdminCommand {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "blacklist_paste" | "bl" => Ok(Self::BlacklistPaste),
            "delete_paste" | "del" => Ok(Self::DeletePaste),
            "whitelist_address" | "wl" => Ok(Self::WhitelistAddress),
            "greylist_address" | "gl" => Ok(Self::GreylistAddress),
            _ => Err(AppError::Validation(MSG_UNSUPPORTED.to_string())),
        }
    }
}

/// Raw admin payload. Every field is optional so preflight can name what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminStatus {
    Success,
    Error,
}

/// Structured result returned for every admin request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminResponse {
    pub message: String,
    pub status: AdminStatus,
}

impl AdminResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: AdminStatus::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: AdminStatus::Error,
        }
    }

    /// Error response carrying the user-facing text of `err`.
    pub fn from_error(err: &AppError) -> Self {
        match err {
            AppError::NotFound => Self::error(MSG_PASTE_NOT_FOUND),
            AppError::Validation(msg) | AppError::Unauthorized(msg) => Self::error(msg.clone()),
            AppError::Upstream(_) => Self::error(MSG_UNRESOLVED),
            AppError::Storage(msg) if msg == MSG_PARTIAL_BLACKLIST => Self::error(msg.clone()),
            _ => Self::error("Internal server error"),
        }
    }
}

/// Authenticate and parse an admin request.
///
/// Checks run in a fixed order and the first failure wins.
///
/// # Arguments
/// - `admin_key`: Configured secret; `None` or empty disables the endpoint.
/// - `request`: Decoded payload, `None` when the body did not decode.
///
/// # Returns
/// The command to run and its raw target.
///
/// # Errors
/// [`AppError::Unauthorized`] for key and token problems,
/// [`AppError::Validation`] for a missing or unknown command.
pub fn preflight(
    admin_key: Option<&str>,
    request: Option<&AdminRequest>,
) -> Result<(AdminCommand, Option<String>), AppError> {
    let admin_key = admin_key
        .filter(|key| !key.is_empty())
        .ok_or_else(|| AppError::Unauthorized(MSG_NO_ADMIN_KEY.to_string()))?;
    let request = request.ok_or_else(|| AppError::Validation(MSG_NO_PAYLOAD.to_string()))?;
    let token = request
        .token
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized(MSG_NO_AUTH.to_string()))?;
    if !tokens_match(token, admin_key) {
        return Err(AppError::Unauthorized(MSG_INVALID_AUTH.to_string()));
    }
    let command = request
        .command
        .as_deref()
        .ok_or_else(|| AppError::Validation(MSG_NO_COMMAND.to_string()))?
        .parse::<AdminCommand>()?;
    Ok((command, request.target.clone()))
}

/// Exact comparison that does not short-circuit on the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Executes admin commands against the paste store and abuse control.
#[derive(Clone)]
pub struct AdminService {
    repo: PasteRepository,
    abuse: AbuseControl,
}

impl AdminService {
    pub fn new(repo: PasteRepository, abuse: AbuseControl) -> Self {
        Self { repo, abuse }
    }

    /// Run an authenticated command.
    ///
    /// Each command performs at most one logical change: when a step fails
    /// nothing has been written. The one exception is `BlacklistPaste`, which
    /// removes the paste before writing the flag and reports
    /// [`MSG_PARTIAL_BLACKLIST`] if only the removal went through.
    ///
    /// # Returns
    /// The success message.
    ///
    /// # Errors
    /// - [`AppError::Validation`] when the target is missing.
    /// - [`AppError::NotFound`] when the target paste does not exist.
    /// - [`AppError::Upstream`] when the subnet cannot be resolved.
    /// - [`AppError::Storage`] with [`MSG_PARTIAL_BLACKLIST`] when the paste
    ///   was removed but its subnet was not flagged.
    pub async fn execute(
        &self,
        command: AdminCommand,
        target: Option<&str>,
    ) -> Result<String, AppError> {
        let target = target.map(str::trim).filter(|value| !value.is_empty());
        let target = match (target, command.targets_paste()) {
            (Some(target), _) => target,
            (None, true) => return Err(AppError::Validation(MSG_NO_PASTE.to_string())),
            (None, false) => return Err(AppError::Validation(MSG_NO_ADDRESS.to_string())),
        };
        tracing::info!(command = command.as_str(), "Running admin command");

        match command {
            AdminCommand::BlacklistPaste => {
                let paste = self.repo.get(target)?.ok_or(AppError::NotFound)?;
                let key = self
                    .abuse
                    .subnet_key(&paste.origin_addr)
                    .await
                    .ok_or_else(|| AppError::Upstream(MSG_UNRESOLVED.to_string()))?;
                if !self.repo.delete(target)? {
                    return Err(AppError::NotFound);
                }
                if let Err(err) = self.abuse.mark_blacklisted(&key) {
                    tracing::error!(paste_id = %target, "Blacklist write failed after removal: {}", err);
                    return Err(AppError::Storage(MSG_PARTIAL_BLACKLIST.to_string()));
                }
                Ok("Added to black list; paste removed.".to_string())
            }
            AdminCommand::DeletePaste => {
                if !self.repo.delete(target)? {
                    return Err(AppError::NotFound);
                }
                Ok("Paste deleted.".to_string())
            }
            AdminCommand::WhitelistAddress => {
                if !self.abuse.whitelist(target).await? {
                    return Err(AppError::Upstream(MSG_UNRESOLVED.to_string()));
                }
                Ok("Removed from filtering.".to_string())
            }
            AdminCommand::GreylistAddress => {
                let paste = self.repo.get(target)?.ok_or(AppError::NotFound)?;
                if !self.abuse.greylist(&paste.origin_addr).await? {
                    return Err(AppError::Upstream(MSG_UNRESOLVED.to_string()));
                }
                Ok("Added to grey list.".to_string())
            }
        }
    }

    /// Preflight and execute, folding every outcome into an [`AdminResponse`].
    pub async fn handle(
        &self,
        admin_key: Option<&str>,
        request: Option<&AdminRequest>,
    ) -> Result<AdminResponse, AppError> {
        let (command, target) = preflight(admin_key, request)?;
        self.execute(command, target.as_deref())
            .await
            .map(AdminResponse::success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abuse::{LocalPrefixResolver, Reputation};
    use crate::constants::BLACKLIST_KEY_PREFIX;
    use crate::db::{KvStore, MemoryStore};
    use crate::models::paste::SubmitPasteRequest;
    use std::sync::Arc;
    use std::time::Duration;

    const KEY: &str = "s3cret";

    /// Memory store that refuses to write blacklist entries.
    struct NoBlacklistWrites(MemoryStore);

    impl KvStore for NoBlacklistWrites {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
            self.0.get(key)
        }

        fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), AppError> {
            if key.starts_with(BLACKLIST_KEY_PREFIX) {
                return Err(AppError::Storage("disk full".to_string()));
            }
            self.0.set_ex(key, value, ttl)
        }

        fn set_nx_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, AppError> {
            self.0.set_nx_ex(key, value, ttl)
        }

        fn delete(&self, key: &str) -> Result<bool, AppError> {
            self.0.delete(key)
        }

        fn expire(&self, key: &str, ttl: Duration) -> Result<bool, AppError> {
            self.0.expire(key, ttl)
        }

        fn purge_expired(&self) -> Result<usize, AppError> {
            self.0.purge_expired()
        }
    }

    fn service() -> (AdminService, PasteRepository, AbuseControl) {
        let store = Arc::new(MemoryStore::new());
        let repo = PasteRepository::new(store.clone());
        let abuse = AbuseControl::new(store, Arc::new(LocalPrefixResolver));
        (
            AdminService::new(repo.clone(), abuse.clone()),
            repo,
            abuse,
        )
    }

    fn seed(repo: &PasteRepository, id: &str, addr: &str) {
        let paste = SubmitPasteRequest {
            code: "spam".to_string(),
            name: "bot".to_string(),
            syntax: "text".to_string(),
            ..SubmitPasteRequest::default()
        }
        .into_paste(addr.to_string());
        repo.put(id, &paste, Duration::from_secs(60)).expect("seed paste");
    }

    fn request(token: Option<&str>, command: Option<&str>, target: Option<&str>) -> AdminRequest {
        AdminRequest {
            token: token.map(str::to_string),
            command: command.map(str::to_string),
            target: target.map(str::to_string),
        }
    }

    #[test]
    fn commands_parse_from_names_and_aliases() {
        for (name, command) in [
            ("blacklist_paste", AdminCommand::BlacklistPaste),
            ("bl", AdminCommand::BlacklistPaste),
            ("delete_paste", AdminCommand::DeletePaste),
            ("del", AdminCommand::DeletePaste),
            ("whitelist_address", AdminCommand::WhitelistAddress),
            ("wl", AdminCommand::WhitelistAddress),
            ("greylist_address", AdminCommand::GreylistAddress),
            ("gl", AdminCommand::GreylistAddress),
        ] {
            assert_eq!(name.parse::<AdminCommand>().expect(name), command);
        }
        assert!("drop_table".parse::<AdminCommand>().is_err());
    }

    #[test]
    fn preflight_checks_run_in_order() {
        let full = request(Some(KEY), Some("del"), Some("ab"));
        let cases: Vec<(Option<&str>, Option<AdminRequest>, &str)> = vec![
            (None, Some(full.clone()), MSG_NO_ADMIN_KEY),
            (Some(""), Some(full.clone()), MSG_NO_ADMIN_KEY),
            (Some(KEY), None, MSG_NO_PAYLOAD),
            (Some(KEY), Some(request(None, Some("del"), None)), MSG_NO_AUTH),
            (Some(KEY), Some(request(Some("wrong"), Some("del"), None)), MSG_INVALID_AUTH),
            (Some(KEY), Some(request(Some(KEY), None, None)), MSG_NO_COMMAND),
            (Some(KEY), Some(request(Some(KEY), Some("nuke"), None)), MSG_UNSUPPORTED),
        ];
        for (key, req, expected) in cases {
            let err = preflight(key, req.as_ref()).expect_err(expected);
            assert_eq!(err.to_string(), expected);
        }

        let (command, target) = preflight(Some(KEY), Some(&full)).expect("valid");
        assert_eq!(command, AdminCommand::DeletePaste);
        assert_eq!(target.as_deref(), Some("ab"));
    }

    #[test]
    fn token_comparison_is_exact() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
        assert!(!tokens_match("", "abc"));
    }

    #[tokio::test]
    async fn wrong_token_leaves_paste_untouched() {
        let (service, repo, _abuse) = service();
        seed(&repo, "ab", "192.0.2.1");
        let req = request(Some("wrong"), Some("delete_paste"), Some("ab"));
        let err = service.handle(Some(KEY), Some(&req)).await.expect_err("rejected");
        assert_eq!(AdminResponse::from_error(&err).status, AdminStatus::Error);
        assert!(repo.exists("ab").expect("exists"));
    }

    #[tokio::test]
    async fn delete_paste_removes_only_the_paste() {
        let (service, repo, abuse) = service();
        seed(&repo, "ab", "192.0.2.1");
        let message = service
            .execute(AdminCommand::DeletePaste, Some("ab"))
            .await
            .expect("delete");
        assert_eq!(message, "Paste deleted.");
        assert!(!repo.exists("ab").expect("exists"));
        assert_eq!(
            abuse.reputation("192.0.2.1").await.expect("reputation"),
            Reputation::Clean
        );
        assert!(matches!(
            service.execute(AdminCommand::DeletePaste, Some("ab")).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn blacklist_paste_blocks_the_submitter_subnet() {
        let (service, repo, abuse) = service();
        seed(&repo, "ab", "198.51.100.7");
        let message = service
            .execute(AdminCommand::BlacklistPaste, Some("ab"))
            .await
            .expect("blacklist");
        assert_eq!(message, "Added to black list; paste removed.");
        assert!(!repo.exists("ab").expect("exists"));
        assert!(abuse.is_blacklisted("198.51.100.200").await.expect("listed"));
    }

    #[tokio::test]
    async fn blacklist_with_unresolvable_origin_changes_nothing() {
        let (service, repo, _abuse) = service();
        seed(&repo, "ab", "undef");
        let err = service
            .execute(AdminCommand::BlacklistPaste, Some("ab"))
            .await
            .expect_err("unresolved");
        assert!(matches!(err, AppError::Upstream(_)));
        assert!(repo.exists("ab").expect("paste kept"));
    }

    #[tokio::test]
    async fn failed_blacklist_write_reports_the_removed_paste() {
        let store = Arc::new(NoBlacklistWrites(MemoryStore::new()));
        let repo = PasteRepository::new(store.clone());
        let abuse = AbuseControl::new(store, Arc::new(LocalPrefixResolver));
        let service = AdminService::new(repo.clone(), abuse.clone());
        seed(&repo, "ab", "198.51.100.7");

        let err = service
            .execute(AdminCommand::BlacklistPaste, Some("ab"))
            .await
            .expect_err("partial");
        let response = AdminResponse::from_error(&err);
        assert_eq!(response.status, AdminStatus::Error);
        assert_eq!(response.message, MSG_PARTIAL_BLACKLIST);
        assert!(!repo.exists("ab").expect("exists"));
        assert!(!abuse.is_blacklisted("198.51.100.7").await.expect("listed"));
    }

    #[tokio::test]
    async fn greylist_then_whitelist_round_trip() {
        let (service, repo, abuse) = service();
        seed(&repo, "ab", "203.0.113.9");
        assert_eq!(
            service
                .execute(AdminCommand::GreylistAddress, Some("ab"))
                .await
                .expect("greylist"),
            "Added to grey list."
        );
        assert!(repo.exists("ab").expect("greylist keeps paste"));
        assert!(abuse.is_greylisted("203.0.113.9").await.expect("grey"));

        for _ in 0..2 {
            assert_eq!(
                service
                    .execute(AdminCommand::WhitelistAddress, Some("203.0.113.9"))
                    .await
                    .expect("whitelist"),
                "Removed from filtering."
            );
        }
        assert_eq!(
            abuse.reputation("203.0.113.9").await.expect("reputation"),
            Reputation::Clean
        );
    }

    #[tokio::test]
    async fn missing_targets_are_reported_per_command() {
        let (service, _repo, _abuse) = service();
        let err = service
            .execute(AdminCommand::GreylistAddress, None)
            .await
            .expect_err("no paste");
        assert_eq!(err.to_string(), MSG_NO_PASTE);
        let err = service
            .execute(AdminCommand::WhitelistAddress, Some("  "))
            .await
            .expect_err("no address");
        assert_eq!(err.to_string(), MSG_NO_ADDRESS);
        let err = service
            .execute(AdminCommand::BlacklistPaste, Some("ff"))
            .await
            .expect_err("missing paste");
        assert_eq!(AdminResponse::from_error(&err).message, MSG_PASTE_NOT_FOUND);
    }
}
