//! Cookie-backed sessions.
//!
//! The gateway keeps no server-side session table. Every attribute lives in an
//! encrypted cookie held by the browser and is decoded again on each request.

pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use store::{SessionError, SessionStore, MAX_SESSION_PAYLOAD};

/// Raw `Bearer <token>` string stored by the login handler.
pub const ACCESS_TOKEN: &str = "access_token";
/// Record code copied from the verified token by the auth gate.
pub const RECORD_CODE: &str = "record_code";
/// Role copied from the verified token by the auth gate.
pub const ROLE: &str = "role";

/// Attribute map for one browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    values: BTreeMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.get(ACCESS_TOKEN)
    }

    pub fn record_code(&self) -> Option<&str> {
        self.get(RECORD_CODE)
    }

    pub fn role(&self) -> Option<&str> {
        self.get(ROLE)
    }
}
