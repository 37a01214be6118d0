//! Captcha verification against the reCAPTCHA `siteverify` endpoint.

use async_trait::async_trait;
use pasteward_core::AppError;
use serde::Deserialize;
use std::time::Duration;

const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Decides whether a captcha answer came from a human.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// # Arguments
    /// - `answer`: Token produced by the captcha widget.
    /// - `remote_addr`: Submitter address, forwarded when known.
    ///
    /// # Errors
    /// Returns [`AppError::Upstream`] when the provider cannot be reached.
    async fn verify(&self, answer: &str, remote_addr: Option<&str>) -> Result<bool, AppError>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
}

/// reCAPTCHA client.
pub struct RecaptchaClient {
    client: reqwest::Client,
    endpoint: String,
    secret: Option<String>,
}

impl RecaptchaClient {
    /// Build a client with a request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(secret: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        Self::with_endpoint(SITEVERIFY_URL, secret, timeout)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Upstream(format!("HTTP client setup failed: {}", err)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            secret,
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaClient {
    async fn verify(&self, answer: &str, remote_addr: Option<&str>) -> Result<bool, AppError> {
        let Some(secret) = self.secret.as_deref() else {
            tracing::warn!("Captcha check requested but no secret is configured");
            return Ok(false);
        };
        if answer.is_empty() {
            return Ok(false);
        }

        let mut params = vec![("secret", secret), ("response", answer)];
        if let Some(addr) = remote_addr {
            params.push(("remoteip", addr));
        }
        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("Captcha provider unreachable: {}", err)))?
            .error_for_status()
            .map_err(|err| AppError::Upstream(format!("Captcha provider error: {}", err)))?;
        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("Captcha response unreadable: {}", err)))?;
        Ok(body.success)
    }
}

/// Verifier with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticVerifier(pub bool);

#[async_trait]
impl CaptchaVerifier for StaticVerifier {
    async fn verify(&self, _answer: &str, _remote_addr: Option<&str>) -> Result<bool, AppError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_secret_rejects_without_network() {
        let client = RecaptchaClient::with_endpoint(
            "http://127.0.0.1:9/siteverify",
            None,
            Duration::from_millis(50),
        )
        .expect("client");
        assert!(!client.verify("token", None).await.expect("verify"));
    }

    #[tokio::test]
    async fn empty_answer_rejects_without_network() {
        let client = RecaptchaClient::with_endpoint(
            "http://127.0.0.1:9/siteverify",
            Some("secret".to_string()),
            Duration::from_millis(50),
        )
        .expect("client");
        assert!(!client.verify("", None).await.expect("verify"));
    }

    #[tokio::test]
    async fn unreachable_provider_is_an_upstream_error() {
        let client = RecaptchaClient::with_endpoint(
            "http://127.0.0.1:9/siteverify",
            Some("secret".to_string()),
            Duration::from_millis(200),
        )
        .expect("client");
        assert!(matches!(
            client.verify("token", Some("192.0.2.1")).await,
            Err(AppError::Upstream(_))
        ));
    }
}
