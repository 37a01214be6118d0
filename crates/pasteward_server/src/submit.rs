//! New-paste pipeline shared by the form and JSON endpoints.

use crate::relay::{self, relay_channels, relay_message};
use crate::AppState;
use pasteward_core::abuse::Reputation;
use pasteward_core::ids::TrustLevel;
use pasteward_core::models::paste::SubmitPasteRequest;
use pasteward_core::sanity::{requested_ttl, validate_submission};
use pasteward_core::AppError;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const MSG_CAPTCHA: &str = "Invalid captcha verification.";
pub const MSG_BLACKLISTED: &str = "Address blacklisted.";

/// A stored submission.
#[derive(Debug)]
pub struct Submitted {
    pub id: String,
    pub url: String,
    /// Whether the HTML form posted it (redirect) rather than a script (link).
    pub web_form: bool,
    /// Pending relay delivery, if one was started.
    pub relay: Option<JoinHandle<()>>,
}

/// Validate, gate and store a submission, then announce it.
///
/// # Arguments
/// - `state`: Application state.
/// - `request`: Raw submission fields.
/// - `origin_addr`: Submitter address.
/// - `body_len`: Size of the request body in bytes.
///
/// # Errors
/// - [`AppError::Validation`] for bad fields or a failed captcha.
/// - [`AppError::Forbidden`] when the submitter subnet is blacklisted.
/// - Store errors from the write.
pub async fn submit_paste(
    state: &AppState,
    request: SubmitPasteRequest,
    origin_addr: String,
    body_len: usize,
) -> Result<Submitted, AppError> {
    let request = request.normalized();
    validate_submission(&request, body_len, state.config.max_paste_size)?;
    let ttl = requested_ttl(&request, Duration::from_secs(state.config.paste_ttl_secs))?;
    let web_form = request.is_web_form();

    // With spam checks off every submitter is trusted; with them on, only a
    // verified captcha earns the short identifiers.
    let trust = if !state.config.spam.check_spam {
        TrustLevel::Verified
    } else if web_form {
        let verdict = state
            .captcha
            .verify(&request.recaptcha_answer, Some(&origin_addr))
            .await;
        match verdict {
            Ok(true) => TrustLevel::Verified,
            Ok(false) => return Err(AppError::Validation(MSG_CAPTCHA.to_string())),
            Err(err) => {
                tracing::warn!("Captcha verification failed: {}", err);
                return Err(AppError::Validation(MSG_CAPTCHA.to_string()));
            }
        }
    } else {
        TrustLevel::Unverified
    };

    let subnet = state.abuse.subnet_key(&origin_addr).await;
    let reputation = match &subnet {
        Some(key) => state.abuse.reputation_of(key)?,
        None => Reputation::Clean,
    };
    if reputation == Reputation::Blacklisted {
        tracing::info!("Rejected submission from blacklisted subnet");
        return Err(AppError::Forbidden(MSG_BLACKLISTED.to_string()));
    }

    let visibility = request.visibility();
    let paste = request.into_paste(origin_addr);
    let id = state.pastes.create(&paste, visibility, trust, ttl)?;
    let url = state.config.paste_url(&id);

    let relay = if web_form && reputation == Reputation::Clean {
        announce(state, &id, &paste.name, paste.private, &url)
    } else {
        None
    };

    Ok(Submitted {
        id,
        url,
        web_form,
        relay,
    })
}

fn announce(
    state: &AppState,
    id: &str,
    name: &str,
    private: bool,
    url: &str,
) -> Option<JoinHandle<()>> {
    let relay_config = &state.config.relay;
    if !relay_config.enabled {
        return None;
    }
    let sink = state.relay.clone()?;
    let channels = relay_channels(relay_config, private);
    if channels.is_empty() {
        return None;
    }

    let parent_name = match state.pastes.resolve_fork_lineage(id) {
        Ok(lineage) => lineage.map(|(_, parent)| parent.name),
        Err(err) => {
            tracing::warn!("Could not load fork parent for relay: {}", err);
            None
        }
    };
    let message = relay_message(url, name, parent_name.as_deref());
    Some(relay::dispatch(
        sink,
        relay_config.password.clone(),
        channels,
        message,
    ))
}
