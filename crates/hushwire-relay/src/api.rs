use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use hushwire_proto::constants::{HEALTH_PATH, LOGIN_PATH, METRICS_PATH, SECURE_PATH, WEBSOCKETS_PATH};
use hushwire_proto::{ChannelRequest, ChannelResponse, LoginRequest, LoginResponse};

use crate::connection::{self, ConnectionLifecycle, ConnectionState};
use crate::directory::{DirectoryError, KeyDirectory};
use crate::error::TransportError;
use crate::metrics::RelayMetrics;
use crate::registry::ConnectionRegistry;
use crate::router::{MessageRouter, RouterHandle};
use crate::token::{TokenIssuer, UserProfile};

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenIssuer>,
    pub directory: KeyDirectory,
    pub registry: Arc<ConnectionRegistry>,
    pub router: RouterHandle,
    pub metrics: Arc<RelayMetrics>,
}

impl AppState {
    /// Build the shared state together with the dispatcher that drains it.
    /// The caller is responsible for running the returned router.
    pub fn new(tokens: TokenIssuer) -> Result<(Self, MessageRouter), prometheus::Error> {
        let metrics = Arc::new(RelayMetrics::new()?);
        let registry = Arc::new(ConnectionRegistry::new());
        let (dispatcher, router) = MessageRouter::new(Arc::clone(&registry), Arc::clone(&metrics));

        let state = Self {
            tokens: Arc::new(tokens),
            directory: KeyDirectory::new(),
            registry,
            router,
            metrics,
        };
        Ok((state, dispatcher))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(LOGIN_PATH, post(login))
        .route(SECURE_PATH, post(secure_channel))
        .route(WEBSOCKETS_PATH, get(websockets))
        .route(HEALTH_PATH, get(get_health))
        .route(METRICS_PATH, get(get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bad_request(reason: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, reason).into_response()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<UserProfile, Response> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    state.tokens.parse_token(value).map_err(|e| {
        state.metrics.auth_failures.inc();
        warn!(error = %e, "Rejected bearer token");
        (StatusCode::UNAUTHORIZED, e.to_string()).into_response()
    })
}

// POST /login
pub async fn login(State(state): State<AppState>, body: Bytes) -> Response {
    let request: LoginRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed login request");
            return bad_request("malformed login request");
        }
    };

    if request.user_name.is_empty() {
        return bad_request("userName is required");
    }
    let Some(public_key) = request.public_key else {
        return bad_request("publicKey is required");
    };

    let token = match state.tokens.create_token(&request.user_name) {
        Ok(token) => token,
        Err(e) => {
            error!(user = %request.user_name, error = %e, "Failed to issue token");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to issue token").into_response();
        }
    };

    state.directory.register_client(&request.user_name, public_key);
    state.metrics.logins.inc();
    info!(user = %request.user_name, "User logged in");

    Json(LoginResponse { auth_token: token }).into_response()
}

// POST /secure
pub async fn secure_channel(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let caller = match authorize(&state, &headers) {
        Ok(profile) => profile,
        Err(response) => return response,
    };

    let request: ChannelRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(user = %caller.user_id, error = %e, "Malformed key lookup");
            return bad_request("malformed key request");
        }
    };
    if request.user_name.is_empty() {
        return bad_request("userName is required");
    }

    match state.directory.retrieve_client(&request.user_name) {
        Ok(public_key) => Json(ChannelResponse { public_key }).into_response(),
        Err(e @ DirectoryError::NotFound(_)) => {
            info!(user = %caller.user_id, wanted = %request.user_name, "Key lookup for unregistered user");
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

// GET /websockets
pub async fn websockets(
    State(state): State<AppState>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let mut lifecycle = ConnectionLifecycle::new();

    let profile = match authorize(&state, &headers) {
        Ok(profile) => profile,
        Err(response) => {
            lifecycle.advance(ConnectionState::Closed);
            return response;
        }
    };
    lifecycle.authenticated(&profile.user_id);

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            let e = TransportError::UpgradeFailed(rejection.body_text());
            warn!(user = %profile.user_id, error = %e, "Persistent connection not established");
            lifecycle.advance(ConnectionState::Closed);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let user_id = profile.user_id;
    upgrade
        .on_failed_upgrade(|e: axum::Error| {
            warn!(error = %TransportError::UpgradeFailed(e.to_string()), "Upgrade failed")
        })
        .on_upgrade(move |socket| connection::handle_socket(socket, user_id, state, lifecycle))
}

// GET /health
pub async fn get_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.export() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to export metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}
