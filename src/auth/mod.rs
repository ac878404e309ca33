//! Access token verification.
//!
//! Tokens are issued by the backend API and signed with a shared HMAC secret.
//! The gateway never issues tokens; it only checks the signature and decodes
//! the claim set into [`AccessClaims`].

pub mod claims;
pub mod error;
pub mod verifier;

pub use claims::{AccessClaims, Role, UnknownRole};
pub use error::VerificationError;
pub use verifier::TokenVerifier;
