//! Client for the deanery backend API.
//!
//! Handlers talk to the backend through the [`BackendApi`] trait so the HTTP
//! implementation can be swapped for a stub in tests.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::HttpBackend;

/// Login credentials forwarded to `POST /api/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub record_code: i64,
    pub password: String,
}

/// Tokens returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Body of `POST /api/get_username`.
#[derive(Debug, Clone, Serialize)]
pub struct RecordCode {
    pub code: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProfileInformation {
    pub user_name: String,
    pub record_code: i64,
}

/// New account forwarded to `POST /api/signup`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub user_name: String,
    pub email: String,
    /// E.164, always with a leading `+`
    pub phone: String,
    pub user_status: String,
}

/// One entry of `GET /api/roles`. The backend owns the shape, so entries are
/// passed through to the signup page as-is.
pub type RoleOption = serde_json::Value;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend endpoint '{endpoint}' answered with status {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("backend response from '{endpoint}' could not be decoded: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl BackendError {
    /// True when the backend refused the request itself (4xx), as opposed to
    /// being unreachable or failing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BackendError::Status { status, .. } if (400..500).contains(status))
    }
}

#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Exchange credentials for an access token.
    async fn login(&self, credentials: &Credentials) -> Result<Tokens, BackendError>;

    /// Look up the display name for a record code.
    async fn username(&self, record_code: i64) -> Result<ProfileInformation, BackendError>;

    /// Roles a new account can be registered with.
    async fn roles(&self) -> Result<Vec<RoleOption>, BackendError>;

    /// Create an account. Succeeds only on `201 Created`.
    async fn signup(&self, registration: &Registration) -> Result<(), BackendError>;
}
