//! Request extractors for submitter addresses and submission bodies.

use crate::{error::HttpError, AppState};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Multipart, Request},
    http::{header, request::Parts, HeaderMap},
    Form,
};
use pasteward_core::models::paste::SubmitPasteRequest;
use pasteward_core::sanity::MSG_TOO_LARGE;
use pasteward_core::AppError;
use std::convert::Infallible;
use std::net::SocketAddr;

/// Placeholder address when the peer is unknown.
const UNKNOWN_ADDR: &str = "undef";

/// Submitter address: the first `X-Forwarded-For` hop when trusted,
/// otherwise the TCP peer.
#[derive(Debug, Clone)]
pub struct ClientAddr(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if state.config.trust_forwarded_for {
            if let Some(addr) = forwarded_for(&parts.headers) {
                return Ok(Self(addr));
            }
        }
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_ADDR.to_string());
        Ok(Self(peer))
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
}

pub(crate) fn content_length(headers: &HeaderMap) -> usize {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// Form submission, either urlencoded or multipart.
///
/// In multipart bodies a `code` field carrying a filename is an upload and
/// is stored as `# FileUpload: <filename>` followed by its contents.
#[derive(Debug)]
pub struct SubmissionForm {
    pub request: SubmitPasteRequest,
    pub body_len: usize,
}

#[async_trait]
impl FromRequest<AppState> for SubmissionForm {
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let body_len = content_length(req.headers());
        if body_len > state.config.max_paste_size {
            return Err(AppError::Validation(MSG_TOO_LARGE.to_string()).into());
        }

        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("multipart/form-data"))
            .unwrap_or(false);

        let request = if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
            read_multipart(multipart).await?
        } else {
            let Form(request) = Form::<SubmitPasteRequest>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
            request
        };

        Ok(Self { request, body_len })
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<SubmitPasteRequest, AppError> {
    let mut request = SubmitPasteRequest {
        private: "0".to_string(),
        ..SubmitPasteRequest::default()
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Validation(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::Validation(err.body_text()))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let value = match (name.as_str(), file_name) {
            ("code", Some(file_name)) => format!("# FileUpload: {}\n{}", file_name, text),
            _ => text,
        };
        assign_field(&mut request, &name, value);
    }
    Ok(request)
}

fn assign_field(request: &mut SubmitPasteRequest, name: &str, value: String) {
    let slot = match name {
        "code" => &mut request.code,
        "name" => &mut request.name,
        "syntax" => &mut request.syntax,
        "private" => &mut request.private,
        "forked_from" => &mut request.forked_from,
        "recaptcha_answer" | "g-recaptcha-response" => &mut request.recaptcha_answer,
        "phone" => &mut request.phone,
        "webform" => &mut request.webform,
        "ttl" => &mut request.ttl,
        _ => return,
    };
    *slot = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_for(&headers), None);
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 198.51.100.4 , 10.0.0.1"),
        );
        assert_eq!(forwarded_for(&headers).as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut request = SubmitPasteRequest::default();
        assign_field(&mut request, "g-recaptcha-response", "tok".to_string());
        assign_field(&mut request, "evil", "x".to_string());
        assert_eq!(request.recaptcha_answer, "tok");
    }

    #[test]
    fn content_length_defaults_to_zero() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), 0);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(content_length(&headers), 42);
    }
}
