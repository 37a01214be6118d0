//! Shared integration-test server bootstrap helpers.

use async_trait::async_trait;
use axum_test::TestServer;
use pasteward_core::abuse::LocalPrefixResolver;
use pasteward_core::config::RelayConfig;
use pasteward_server::captcha::StaticVerifier;
use pasteward_server::relay::RelaySink;
use pasteward_server::{create_app, AppError, AppState, Config, MemoryStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const ADMIN_KEY: &str = "s3cret";
pub(crate) const PUBLIC_URL: &str = "http://paste.test/";

/// Relay that records every line instead of sending it.
#[derive(Default)]
pub(crate) struct RecordingRelay {
    lines: Mutex<Vec<String>>,
}

impl RecordingRelay {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("relay lock").clone()
    }

    /// Wait for detached deliveries to land.
    pub(crate) async fn wait_for(&self, count: usize) -> Vec<String> {
        for _ in 0..100 {
            if self.lines().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.lines()
    }
}

#[async_trait]
impl RelaySink for RecordingRelay {
    async fn deliver(&self, line: &str) -> Result<(), AppError> {
        self.lines.lock().expect("relay lock").push(line.to_string());
        Ok(())
    }
}

pub(crate) fn test_config() -> Config {
    Config {
        port: 0,
        db_path: String::from("unused"),
        max_paste_size: 4096,
        public_url: PUBLIC_URL.to_string(),
        admin_key: Some(ADMIN_KEY.to_string()),
        trust_forwarded_for: true,
        relay: RelayConfig {
            enabled: true,
            host: Some("127.0.0.1".to_string()),
            port: 12345,
            password: "pw".to_string(),
            channels: vec!["#pastes".to_string()],
            admin_channels: vec!["#admins".to_string()],
        },
        ..Config::default()
    }
}

pub(crate) struct Harness {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub relay: Arc<RecordingRelay>,
}

pub(crate) fn harness_with(config: Config, captcha_passes: bool) -> Harness {
    let relay = Arc::new(RecordingRelay::default());
    let store = Arc::new(MemoryStore::new());
    let state = AppState::with_collaborators(
        config,
        store.clone(),
        Arc::new(LocalPrefixResolver),
        Arc::new(StaticVerifier(captcha_passes)),
        Some(relay.clone() as Arc<dyn RelaySink>),
    );
    let server = TestServer::new(create_app(state.clone())).expect("server");
    Harness {
        server,
        store,
        state,
        relay,
    }
}

pub(crate) fn harness() -> Harness {
    harness_with(test_config(), true)
}
