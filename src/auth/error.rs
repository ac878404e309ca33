use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use thiserror::Error;

/// Reasons a bearer token could not be turned into [`AccessClaims`](super::AccessClaims).
///
/// The variants exist for diagnostics only. At the gate boundary every one of
/// them collapses into the same client-facing "incorrect access token" reply.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("unsupported signing algorithm")]
    UnsupportedAlgorithm,

    #[error("token signature does not match")]
    SignatureMismatch,

    #[error("missing required claim '{0}'")]
    MissingClaim(&'static str),

    #[error("claim '{name}' must be {expected}")]
    InvalidClaim {
        name: &'static str,
        expected: &'static str,
    },
}

impl From<JwtError> for VerificationError {
    fn from(err: JwtError) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => VerificationError::SignatureMismatch,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm
            | ErrorKind::InvalidKeyFormat => VerificationError::UnsupportedAlgorithm,
            _ => VerificationError::Malformed(err.to_string()),
        }
    }
}
