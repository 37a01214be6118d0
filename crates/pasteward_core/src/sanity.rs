//! Submission field validation.

use crate::constants::{MAX_CLIENT_TTL_MINUTES, MIN_CLIENT_TTL_MINUTES};
use crate::error::AppError;
use crate::models::paste::SubmitPasteRequest;
use std::time::Duration;

pub const MSG_TOO_LARGE: &str = "This request is too large to process.";
pub const MSG_MISSING_FIELDS: &str = "All fields need to be filled out.";
pub const MSG_INVALID_INPUT: &str = "Invalid input detected.";
pub const MSG_SPAM: &str = "Your post triggered our spam filters!";
pub const MSG_INVALID_TTL: &str = "Invalid expiration requested.";

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, '[' | ']' | '\\' | '{' | '}' | '|' | '`' | '-' | '_')
}

fn is_name_rest(ch: char) -> bool {
    is_name_start(ch) || ch.is_ascii_digit()
}

/// IRC-nick shaped display names: a letter or one of ``[]\{}|`-_``, then
/// the same set plus digits.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start(first) => chars.all(is_name_rest),
        _ => false,
    }
}

/// Check a normalized submission.
///
/// `body_len` is the size of the raw request body.
///
/// # Errors
/// Returns [`AppError::Validation`] carrying the message shown to the submitter.
pub fn validate_submission(
    request: &SubmitPasteRequest,
    body_len: usize,
    max_size: usize,
) -> Result<(), AppError> {
    if body_len > max_size || request.code.len() > max_size {
        return Err(AppError::Validation(MSG_TOO_LARGE.to_string()));
    }

    let required = [
        &request.code,
        &request.private,
        &request.syntax,
        &request.name,
    ];
    if required.iter().any(|field| field.is_empty()) {
        return Err(AppError::Validation(MSG_MISSING_FIELDS.to_string()));
    }

    if !is_valid_name(&request.name) {
        return Err(AppError::Validation(MSG_INVALID_INPUT.to_string()));
    }

    if !request.forked_from.is_empty() && !crate::ids::is_valid_id(&request.forked_from) {
        return Err(AppError::Validation(MSG_INVALID_INPUT.to_string()));
    }

    if !request.phone.is_empty() {
        return Err(AppError::Validation(MSG_SPAM.to_string()));
    }

    Ok(())
}

/// Lifetime for a submission: the configured default, or the client's
/// choice in minutes when given.
///
/// # Errors
/// Returns [`AppError::Validation`] for unparseable or out-of-range values.
pub fn requested_ttl(request: &SubmitPasteRequest, default: Duration) -> Result<Duration, AppError> {
    if request.ttl.is_empty() {
        return Ok(default);
    }
    let minutes: u64 = request
        .ttl
        .parse()
        .map_err(|_| AppError::Validation(MSG_INVALID_TTL.to_string()))?;
    if !(MIN_CLIENT_TTL_MINUTES..=MAX_CLIENT_TTL_MINUTES).contains(&minutes) {
        return Err(AppError::Validation(MSG_INVALID_TTL.to_string()));
    }
    Ok(Duration::from_secs(minutes * 60))
}
