// handlers/public/login.rs - GET/POST /users/login

use axum::{
    extract::State,
    http::{header::LOCATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Form,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::backend::Credentials;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::session::{Session, SessionError, ACCESS_TOKEN, RECORD_CODE, ROLE};

/// Where a successful login lands
pub const PROFILE_PATH: &str = "/users/profile";

/// Fields of the login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Record code, submitted as text by the browser
    pub login: String,
    pub password: String,
}

/// GET /users/login - Describe the login form
pub async fn login_page() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "form": {
            "action": "/users/login",
            "method": "POST",
            "fields": {
                "login": "record code (numeric)",
                "password": "password"
            }
        }
    }))
}

/// POST /users/login - Exchange credentials for an access token
///
/// The backend's token is stored in the session as `Bearer <token>` and the
/// browser is redirected to the profile page, where the auth gate verifies it.
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let record_code: i64 = form
        .login
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Login must be a numeric record code"))?;

    let credentials = Credentials {
        record_code,
        password: form.password,
    };

    let tokens = state.backend.login(&credentials).await.map_err(|e| {
        if e.is_rejection() {
            tracing::info!(record_code, "backend refused login: {}", e);
            ApiError::unauthorized("Incorrect record code or password")
        } else {
            ApiError::from(e)
        }
    })?;

    // Logging in replaces a session that no longer decodes
    let mut session = match state.sessions.load(&headers) {
        Ok(session) => session,
        Err(SessionError::Decode(e)) => {
            tracing::warn!(record_code, "discarding undecodable session at login: {}", e);
            Session::new()
        }
        Err(e) => return Err(e.into()),
    };
    // Claims from a previous token must not outlive it; the gate re-derives them
    session.remove(RECORD_CODE);
    session.remove(ROLE);
    session.insert(ACCESS_TOKEN, format!("Bearer {}", tokens.access_token));

    let jar = state.sessions.save(&session)?;

    tracing::info!(record_code, "user logged in");

    Ok((jar, (StatusCode::FOUND, [(LOCATION, PROFILE_PATH)])))
}
