//! Best-effort chat relay notifications for new pastes.
//!
//! The relay daemon accepts one line per connection:
//! `<channel>;<password>;<message>\n`. Delivery happens on a detached task;
//! failures are logged and never reach the submitter.

use async_trait::async_trait;
use pasteward_core::config::RelayConfig;
use pasteward_core::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Transport for relay lines.
#[async_trait]
pub trait RelaySink: Send + Sync {
    /// Deliver one already-formatted line.
    async fn deliver(&self, line: &str) -> Result<(), AppError>;
}

/// Plain TCP relay, one connection per line.
#[derive(Debug, Clone)]
pub struct TcpRelay {
    addr: String,
    timeout: Duration,
}

impl TcpRelay {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// # Returns
    /// `None` when the relay is disabled or has no host.
    pub fn from_config(config: &RelayConfig, timeout: Duration) -> Option<Self> {
        if !config.is_usable() {
            return None;
        }
        let host = config.host.as_deref()?;
        Some(Self::new(format!("{}:{}", host, config.port), timeout))
    }
}

#[async_trait]
impl RelaySink for TcpRelay {
    async fn deliver(&self, line: &str) -> Result<(), AppError> {
        let send = async {
            let mut stream = TcpStream::connect(&self.addr).await?;
            stream.write_all(line.as_bytes()).await?;
            stream.shutdown().await
        };
        timeout(self.timeout, send)
            .await
            .map_err(|_| AppError::Upstream(format!("Relay {} timed out", self.addr)))?
            .map_err(|err| AppError::Upstream(format!("Relay {} failed: {}", self.addr, err)))
    }
}

/// Announcement text for a paste.
///
/// Forks name both authors when the parent is still around.
pub fn relay_message(url: &str, name: &str, parent_name: Option<&str>) -> String {
    match parent_name {
        Some(parent) => format!("Paste from {} forked by {}: [ {} ]", parent, name, url),
        None => format!("Paste from {}: [ {} ]", name, url),
    }
}

/// Channels to notify: admin channels always, public ones only for public pastes.
pub fn relay_channels(config: &RelayConfig, private: bool) -> Vec<String> {
    let mut channels = config.admin_channels.clone();
    if !private {
        channels.extend(config.channels.iter().cloned());
    }
    channels
}

pub fn relay_line(channel: &str, password: &str, message: &str) -> String {
    format!("{};{};{}\n", channel, password, message)
}

/// Send `message` to every channel on a detached task.
///
/// # Returns
/// The task handle; dropping it does not cancel delivery.
pub fn dispatch(
    sink: Arc<dyn RelaySink>,
    password: String,
    channels: Vec<String>,
    message: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        for channel in channels {
            let line = relay_line(&channel, &password, &message);
            if let Err(err) = sink.deliver(&line).await {
                tracing::warn!(channel = %channel, "Unable to relay paste notification: {}", err);
            }
        }
    })
}
