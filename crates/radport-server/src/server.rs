use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use radport_auth::storage::MemoryAuthStorage;
use radport_auth::{AuthzState, IdpClient, RefreshCoordinator};
use radport_imaging::ImagingClient;

use crate::{config::AppConfig, http};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Session and user stores plus cookie settings, used by the extractors.
    pub authz: AuthzState,
    /// Identity provider client for token grants and user administration.
    pub idp: IdpClient,
    /// On-demand credential refresh, shared with the imaging gateway.
    pub refresher: Arc<RefreshCoordinator>,
    /// Imaging backend gateway.
    pub imaging: ImagingClient,
}

impl FromRef<AppState> for AuthzState {
    fn from_ref(state: &AppState) -> Self {
        state.authz.clone()
    }
}

pub struct RadportServer {
    addr: SocketAddr,
    app: Router,
}

/// Wires storage, the identity provider client, the refresh coordinator, and
/// the imaging gateway from the configuration.
pub fn build_state(config: &AppConfig) -> Result<AppState, String> {
    let storage = Arc::new(MemoryAuthStorage::new());
    let authz =
        AuthzState::new(storage.clone(), storage).with_cookie_config(config.cookie_config());
    let idp = IdpClient::new(config.idp_config()?);
    let refresher = Arc::new(RefreshCoordinator::new(authz.sessions.clone(), idp.clone()));
    let imaging = ImagingClient::new(config.imaging_config()?, refresher.clone());

    Ok(AppState {
        authz,
        idp,
        refresher,
        imaging,
    })
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(http::health))
        // Session lifecycle
        .route("/auth/login", post(http::auth::login))
        .route("/auth/logout", post(http::auth::logout))
        .route("/auth/register", post(http::auth::register))
        .route("/auth/session", get(http::auth::current_session))
        .route("/auth/profile", put(http::auth::update_profile))
        // Admin user management
        .route("/users", get(http::users::list_users))
        .route(
            "/users/{id}",
            put(http::users::update_user).delete(http::users::delete_user),
        )
        // Imaging listings
        .route("/checks/public", get(http::checks::list_checks_public))
        .route("/checks", get(http::checks::list_checks))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn build(self) -> anyhow::Result<RadportServer> {
        let state = build_state(&self.config).map_err(anyhow::Error::msg)?;
        let app = build_app(state);

        Ok(RadportServer {
            addr: self.addr,
            app,
        })
    }
}

impl RadportServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
