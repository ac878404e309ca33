// handlers/protected/session.rs - POST /users/logout

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::app::AppState;
use crate::middleware::SessionUser;

/// POST /users/logout - Drop the session cookie
pub async fn logout(State(state): State<AppState>, user: SessionUser, headers: HeaderMap) -> impl IntoResponse {
    tracing::info!(record_code = %user.record_code, "user logged out");

    (state.sessions.clear(&headers), StatusCode::NO_CONTENT)
}
