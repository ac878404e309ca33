use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{Role, TokenVerifier, VerificationError};
use crate::error::ApiError;
use crate::session::{Session, SessionError, SessionStore, RECORD_CODE, ROLE};

/// Paths served without authentication. Everything on this list is reachable
/// by anyone, so it holds the login page and nothing else.
pub const BYPASS_PATHS: &[&str] = &["/users/login"];

/// Identity the gate attaches to every admitted request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub record_code: String,
    pub role: Role,
}

/// Why the gate refused a request
#[derive(Debug, Error)]
pub enum GateRejection {
    #[error("session has no access token")]
    MissingBearer,

    #[error("access token is not in 'Bearer {{token}}' form")]
    MalformedBearer,

    #[error("access token failed verification: {0}")]
    InvalidToken(#[from] VerificationError),

    #[error("access token expired at {expiry}")]
    Expired { expiry: i64 },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<GateRejection> for ApiError {
    fn from(rejection: GateRejection) -> Self {
        // Verification causes stay in the logs; clients only learn the token was bad
        match rejection {
            GateRejection::MissingBearer => ApiError::unauthorized("Authorization data missing"),
            GateRejection::MalformedBearer => {
                ApiError::bad_request("Must provide Authorization data with format Bearer {token}")
            }
            GateRejection::InvalidToken(_) => ApiError::bad_request("Incorrect access token provided"),
            GateRejection::Expired { .. } => ApiError::unauthorized("Token expired"),
            GateRejection::Session(_) => ApiError::internal_server_error("Unable to save session data"),
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Session-backed authentication gate.
///
/// Claims are re-verified on every request and written back into the
/// session, so a session never carries claims from a token that no longer
/// verifies.
#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<TokenVerifier>,
    sessions: Arc<SessionStore>,
    bypass: &'static [&'static str],
}

impl AuthGate {
    pub fn new(verifier: Arc<TokenVerifier>, sessions: Arc<SessionStore>) -> Self {
        Self {
            verifier,
            sessions,
            bypass: BYPASS_PATHS,
        }
    }

    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass.contains(&path)
    }

    /// Run the bearer, verification and expiry checks against `session`.
    ///
    /// On success the session holds the token's `record_code` and `role`. On
    /// any rejection the session is left untouched.
    pub fn evaluate(&self, session: &mut Session, now: i64) -> Result<SessionUser, GateRejection> {
        let bearer = session.access_token().ok_or(GateRejection::MissingBearer)?;
        let token = parse_bearer(bearer).ok_or(GateRejection::MalformedBearer)?;

        let claims = self.verifier.verify(token)?;
        if claims.is_expired_at(now) {
            return Err(GateRejection::Expired {
                expiry: claims.expiry(),
            });
        }

        session.insert(RECORD_CODE, claims.record_code());
        session.insert(ROLE, claims.role().as_str());

        Ok(SessionUser {
            record_code: claims.record_code().to_string(),
            role: claims.role(),
        })
    }
}

/// Split `Bearer <token>` into the token. Exactly one scheme prefix followed by
/// a non-empty token without whitespace is accepted.
fn parse_bearer(value: &str) -> Option<&str> {
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

/// Authentication middleware for the page routes.
///
/// Loads the session, admits or rejects via [`AuthGate::evaluate`], persists
/// the refreshed session and hands the request on with [`SessionUser`] and
/// [`Session`] in its extensions.
pub async fn authenticate_middleware(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    let path = request.uri().path().to_owned();
    if gate.is_bypassed(&path) {
        return Ok(next.run(request).await);
    }

    let mut session = gate.sessions.load(request.headers()).inspect_err(|e| {
        tracing::error!(%path, "failed to load session: {}", e);
    })?;

    let now = chrono::Utc::now().timestamp();
    let user = gate.evaluate(&mut session, now).inspect_err(|rejection| {
        tracing::warn!(%path, "auth gate rejected request: {}", rejection);
    })?;

    let jar = gate.sessions.save(&session).inspect_err(|e| {
        tracing::error!(%path, "failed to save session: {}", e);
    })?;

    tracing::debug!(%path, record_code = %user.record_code, role = %user.role, "auth gate admitted request");

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(session);

    let response = next.run(request).await;

    // A handler that wrote the session cookie itself (logout) has the last word
    if sets_cookie(&response, gate.sessions.cookie_name()) {
        return Ok(response);
    }
    Ok((jar, response).into_response())
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.split_once('=').is_some_and(|(cookie, _)| cookie.trim() == name))
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authorization data missing"))
    }
}
