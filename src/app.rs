use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth::TokenVerifier;
use crate::backend::{BackendApi, BackendError, HttpBackend};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{authenticate_middleware, ApiResponse, AuthGate};
use crate::session::SessionStore;

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub gate: AuthGate,
    pub sessions: Arc<SessionStore>,
    pub backend: Arc<dyn BackendApi>,
}

impl AppState {
    pub fn new(verifier: TokenVerifier, sessions: SessionStore, backend: Arc<dyn BackendApi>) -> Self {
        let sessions = Arc::new(sessions);
        let gate = AuthGate::new(Arc::new(verifier), sessions.clone());

        Self {
            gate,
            sessions,
            backend,
        }
    }

    /// Wire the verifier, session store and HTTP backend client from config
    pub fn from_config(config: &AppConfig) -> Result<Self, BackendError> {
        let verifier = TokenVerifier::new(&config.security.jwt_secret);
        let sessions = SessionStore::new(
            &config.security.session_key,
            config.security.session_cookie_name.clone(),
            config.security.secure_cookies,
        );
        let backend = HttpBackend::new(&config.backend.base_url, config.backend_timeout())?;

        Ok(Self::new(verifier, sessions, Arc::new(backend)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/health", get(health))
        // Page routes behind the auth gate
        .merge(user_routes(&state))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Bypassed by the gate
        .route(
            "/users/login",
            get(public::user_login_page).post(public::user_login_submit),
        )
        // Verified on every request
        .route("/users/profile", get(protected::user_profile))
        .route("/users/logout", post(protected::user_logout))
        .route(
            "/users/signup",
            get(protected::user_signup_page).post(protected::user_signup_submit),
        )
        .route("/users/signup/success", get(protected::user_signup_success))
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            authenticate_middleware,
        ))
}

async fn health() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
