//! pasteward server entrypoint.

use pasteward_core::abuse::{CymruResolver, LocalPrefixResolver, SubnetResolver};
use pasteward_core::DEFAULT_PORT;
use pasteward_server::{
    resolve_bind_address, serve_router, spawn_purge_task, AppState, Config, KvStore, RedbStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PURGE_INTERVAL: Duration = Duration::from_secs(600);

/// `WHOIS_SERVER=local` skips WHOIS and groups by fixed-size prefixes.
fn build_resolver(config: &Config) -> Arc<dyn SubnetResolver> {
    if config.whois_server.eq_ignore_ascii_case("local") {
        tracing::info!("Using local /24 and /48 subnet grouping");
        Arc::new(LocalPrefixResolver)
    } else {
        Arc::new(CymruResolver::new(
            config.whois_server.clone(),
            config.upstream_timeout(),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pasteward=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if std::env::args().skip(1).any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    let config = Config::from_env();
    if config.admin_key.is_none() {
        tracing::warn!("ADMIN_KEY is not set; administrative commands are disabled");
    }
    if config.spam.check_spam && config.spam.recaptcha_secret.is_none() {
        tracing::warn!("CHECK_SPAM is on without RECAPTCHA_SECRET; web-form posts will be rejected");
    }

    let store: Arc<dyn KvStore> = Arc::new(RedbStore::open(&config.db_path)?);
    tracing::info!("Opened store at {}", config.db_path);

    let resolver = build_resolver(&config);
    let state = AppState::new(config.clone(), store.clone(), resolver)?;
    if state.relay.is_none() {
        tracing::info!("Relay notifications disabled");
    }

    let purge = spawn_purge_task(store, PURGE_INTERVAL);

    let bind_addr = resolve_bind_address(&config);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!("pasteward running at http://{}", actual_addr);

    let serve_result = serve_router(listener, state, shutdown_signal()).await;
    purge.abort();
    serve_result?;

    Ok(())
}

fn print_help() {
    println!("pasteward server\n");
    println!("Usage: pasteward [--help]\n");
    println!("Environment variables:");
    println!("  DB_PATH              Store path (default: ~/.cache/pasteward/pastes.redb)");
    println!("  PORT                 Server port (default: {})", DEFAULT_PORT);
    println!("  BIND                 Bind address override (e.g. 127.0.0.1:{})", DEFAULT_PORT);
    println!("  PUBLIC_URL           Base URL for paste links");
    println!("  MAX_PASTE_SIZE       Maximum paste size in bytes (default: 1MiB)");
    println!("  PASTE_TTL_SECS       Paste lifetime (default: 345600)");
    println!("  ADMIN_KEY            Shared secret for /admin");
    println!("  TRUST_FORWARDED_FOR  Use X-Forwarded-For as the submitter address");
    println!("  CHECK_SPAM           Require captcha for web-form posts");
    println!("  RECAPTCHA_SECRET     reCAPTCHA secret key");
    println!("  RECAPTCHA_SITEKEY    reCAPTCHA site key");
    println!("  RELAY_ENABLED        Announce new pastes (default: true)");
    println!("  RELAY_HOST, RELAY_PORT, RELAY_PASS");
    println!("  RELAY_CHAN           Public channels, comma-separated");
    println!("  RELAY_ADMIN_CHAN     Admin channels, comma-separated");
    println!("  WHOIS_SERVER         host:port, or 'local' (default: whois.cymru.com:43)");
    println!("  UPSTREAM_TIMEOUT_MS  Captcha/WHOIS/relay timeout (default: 5000)");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}
