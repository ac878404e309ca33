use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::error::VerificationError;

pub const EXPIRY_CLAIM: &str = "expiry";
pub const ISSUED_AT_CLAIM: &str = "issued_at";
pub const RECORD_CODE_CLAIM: &str = "record_code";
pub const ROLE_CLAIM: &str = "role";

/// Roles the backend issues tokens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Professor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Professor => "professor",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "professor" => Ok(Role::Professor),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by a verified access token.
///
/// Only [`TokenVerifier::verify`](super::TokenVerifier::verify) can produce a
/// value of this type, so holding one means the signature was checked against
/// the configured secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    expiry: i64,
    issued_at: i64,
    record_code: String,
    role: Role,
}

impl AccessClaims {
    /// Decode a signature-checked claim set, reporting the first missing or
    /// mistyped field.
    pub(super) fn from_verified(claims: &Map<String, Value>) -> Result<Self, VerificationError> {
        Ok(Self {
            expiry: timestamp_claim(claims, EXPIRY_CLAIM)?,
            issued_at: timestamp_claim(claims, ISSUED_AT_CLAIM)?,
            record_code: record_code_claim(claims)?,
            role: role_claim(claims)?,
        })
    }

    /// Absolute expiry as Unix seconds.
    pub fn expiry(&self) -> i64 {
        self.expiry
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn record_code(&self) -> &str {
        &self.record_code
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// True when `now` is past the expiry. A token expiring exactly at `now`
    /// is still usable.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiry < now
    }
}

fn claim<'a>(claims: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, VerificationError> {
    match claims.get(name) {
        None | Some(Value::Null) => Err(VerificationError::MissingClaim(name)),
        Some(value) => Ok(value),
    }
}

// Issuers written against float-only JSON number types emit timestamps like
// 1700000000.0, so finite floats are accepted and truncated.
fn timestamp_claim(claims: &Map<String, Value>, name: &'static str) -> Result<i64, VerificationError> {
    let invalid = VerificationError::InvalidClaim {
        name,
        expected: "a numeric Unix timestamp",
    };

    match claim(claims, name)? {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(v)
            } else {
                match n.as_f64() {
                    Some(v) if v.is_finite() && v.abs() < i64::MAX as f64 => Ok(v as i64),
                    _ => Err(invalid),
                }
            }
        }
        _ => Err(invalid),
    }
}

fn record_code_claim(claims: &Map<String, Value>) -> Result<String, VerificationError> {
    match claim(claims, RECORD_CODE_CLAIM)? {
        Value::String(code) if !code.is_empty() => Ok(code.clone()),
        _ => Err(VerificationError::InvalidClaim {
            name: RECORD_CODE_CLAIM,
            expected: "a non-empty string",
        }),
    }
}

fn role_claim(claims: &Map<String, Value>) -> Result<Role, VerificationError> {
    claim(claims, ROLE_CLAIM)?
        .as_str()
        .and_then(|role| role.parse().ok())
        .ok_or(VerificationError::InvalidClaim {
            name: ROLE_CLAIM,
            expected: "one of 'student' or 'professor'",
        })
}
