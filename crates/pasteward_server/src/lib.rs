//! HTTP server wiring for pasteward (routes, shared state, background tasks).

/// Captcha verification.
pub mod captcha;
/// HTTP error mapping for handlers.
pub mod error;
/// HTTP handlers for paste and admin endpoints.
pub mod handlers;
/// Relay notifications.
pub mod relay;
/// New-paste pipeline.
pub mod submit;

pub use pasteward_core::{
    abuse, admin, config, db, models, AppError, Config, KvStore, MemoryStore, RedbStore,
    DEFAULT_PORT,
};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use captcha::{CaptchaVerifier, RecaptchaClient, StaticVerifier};
use pasteward_core::abuse::{AbuseControl, SubnetResolver};
use pasteward_core::admin::AdminService;
use pasteward_core::PasteRepository;
use relay::{RelaySink, TcpRelay};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::{
    compression::CompressionLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

/// Room for form field names and multipart framing on top of the paste itself.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state passed to HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pastes: PasteRepository,
    pub abuse: AbuseControl,
    pub admin: AdminService,
    pub captcha: Arc<dyn CaptchaVerifier>,
    /// `None` when no relay is configured.
    pub relay: Option<Arc<dyn RelaySink>>,
}

impl AppState {
    /// Construct shared state with the production collaborators.
    ///
    /// # Arguments
    /// - `config`: Loaded configuration.
    /// - `store`: Key-value store shared by pastes and reputation entries.
    /// - `resolver`: Subnet resolver for abuse control.
    ///
    /// # Errors
    /// Returns an error if the captcha HTTP client cannot be built.
    pub fn new(
        config: Config,
        store: Arc<dyn KvStore>,
        resolver: Arc<dyn SubnetResolver>,
    ) -> Result<Self, AppError> {
        let captcha: Arc<dyn CaptchaVerifier> = if config.spam.check_spam {
            Arc::new(RecaptchaClient::new(
                config.spam.recaptcha_secret.clone(),
                config.upstream_timeout(),
            )?)
        } else {
            Arc::new(StaticVerifier(true))
        };
        let relay = TcpRelay::from_config(&config.relay, config.upstream_timeout())
            .map(|relay| Arc::new(relay) as Arc<dyn RelaySink>);
        Ok(Self::with_collaborators(
            config, store, resolver, captcha, relay,
        ))
    }

    /// Construct shared state with explicit collaborators.
    pub fn with_collaborators(
        config: Config,
        store: Arc<dyn KvStore>,
        resolver: Arc<dyn SubnetResolver>,
        captcha: Arc<dyn CaptchaVerifier>,
        relay: Option<Arc<dyn RelaySink>>,
    ) -> Self {
        let pastes = PasteRepository::new(store.clone());
        let abuse = AbuseControl::new(store, resolver);
        let admin = AdminService::new(pastes.clone(), abuse.clone());
        Self {
            config: Arc::new(config),
            pastes,
            abuse,
            admin,
            captcha,
            relay,
        }
    }
}

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_paste_size.saturating_add(BODY_OVERHEAD_BYTES);

    Router::new()
        .route(
            "/",
            get(handlers::paste::index).post(handlers::paste::submit_form),
        )
        .route("/healthz", get(handlers::paste::healthz))
        .route("/admin", post(handlers::admin::run_command))
        .route("/api/paste", post(handlers::paste::create_paste))
        .route("/api/paste/:id", get(handlers::paste::get_paste))
        .route("/r/:id", get(handlers::paste::get_raw))
        .route("/f/:id", get(handlers::paste::fork_paste))
        .route("/d/:orig/:fork", get(handlers::paste::diff_pastes))
        .route("/:id", get(handlers::paste::view_paste))
        .with_state(state)
        .layer(
            tower::ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static(
                        "default-src 'self'; frame-ancestors 'none'; base-uri 'self'; form-action 'self'",
                    ),
                )),
        )
}

/// Resolve the listener address from the `BIND` override.
///
/// # Returns
/// `BIND` when it parses, otherwise `0.0.0.0:<port>`.
pub fn resolve_bind_address(config: &Config) -> SocketAddr {
    let default_bind = SocketAddr::from(([0, 0, 0, 0], config.port));
    match std::env::var("BIND") {
        Ok(value) => match value.trim().parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::warn!(
                    "Invalid BIND='{}': {}. Falling back to {}",
                    value,
                    err,
                    default_bind
                );
                default_bind
            }
        },
        Err(_) => default_bind,
    }
}

/// Periodically drop expired entries from the store.
///
/// Reads already hide expired entries; this only reclaims space.
pub fn spawn_purge_task(store: Arc<dyn KvStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let store = store.clone();
            match tokio::task::spawn_blocking(move || store.purge_expired()).await {
                Ok(Ok(0)) => {}
                Ok(Ok(purged)) => tracing::info!("Purged {} expired entries", purged),
                Ok(Err(err)) => tracing::warn!("Expiry purge failed: {}", err),
                Err(err) => tracing::warn!("Expiry purge task panicked: {}", err),
            }
        }
    })
}

/// Run the Axum server with graceful shutdown support.
///
/// Connection info is attached so handlers can see the peer address.
///
/// # Errors
/// Returns any I/O error produced by `axum::serve`.
pub async fn serve_router(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let app = create_app(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
}
