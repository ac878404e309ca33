use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::claims::AccessClaims;
use super::error::VerificationError;

/// HMAC algorithms the gate accepts. Tokens signed any other way are rejected
/// before the signature is looked at.
pub const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Verifies access tokens against the process-wide shared secret.
///
/// Verification is a pure function of the token and the secret: no clock is
/// read here, so expiry is left to the caller.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        // The backend uses its own claim names (`expiry`, `issued_at`), so the
        // registered-claim checks are switched off and done by AccessClaims.
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Verify `token` (without any `Bearer ` prefix) and decode its claims.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, VerificationError> {
        let alg = header_algorithm(token)?;
        let accepted = Algorithm::from_str(&alg).is_ok_and(|alg| ACCEPTED_ALGORITHMS.contains(&alg));
        if !accepted {
            return Err(VerificationError::UnsupportedAlgorithm);
        }

        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation)?;
        AccessClaims::from_verified(&data.claims)
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// `alg` from the token header, read as plain text so that names jsonwebtoken
/// has no variant for (`none`) still reach the algorithm check.
fn header_algorithm(token: &str) -> Result<String, VerificationError> {
    let segment = token
        .split('.')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| VerificationError::Malformed("token has no header segment".into()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| VerificationError::Malformed(format!("header is not base64url: {}", e)))?;
    let header: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| VerificationError::Malformed(format!("header is not a JWT header: {}", e)))?;

    Ok(header.alg)
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-jwt-secret";

    fn sign(alg: Algorithm, secret: &str, claims: &Value) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn student_claims(expiry: i64) -> Value {
        json!({
            "expiry": expiry,
            "issued_at": 1_700_000_000,
            "record_code": "12345",
            "role": "student",
        })
    }

    #[test]
    fn verifies_hmac_signed_tokens() {
        let verifier = TokenVerifier::new(SECRET);

        for alg in ACCEPTED_ALGORITHMS {
            let token = sign(alg, SECRET, &student_claims(1_700_003_600));
            let claims = verifier.verify(&token).unwrap();
            assert_eq!(claims.record_code(), "12345");
            assert_eq!(claims.role(), Role::Student);
            assert_eq!(claims.expiry(), 1_700_003_600);
        }
    }

    #[test]
    fn does_not_check_expiry() {
        let verifier = TokenVerifier::new(SECRET);
        let token = sign(Algorithm::HS256, SECRET, &student_claims(10));

        assert_eq!(verifier.verify(&token).unwrap().expiry(), 10);
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let verifier = TokenVerifier::new(SECRET);
        let token = sign(Algorithm::HS256, "someone-else", &student_claims(1_700_003_600));

        assert_eq!(verifier.verify(&token), Err(VerificationError::SignatureMismatch));
    }

    #[test]
    fn rejects_garbage() {
        let verifier = TokenVerifier::new(SECRET);

        assert!(matches!(verifier.verify("not-a-token"), Err(VerificationError::Malformed(_))));
        assert!(matches!(verifier.verify(""), Err(VerificationError::Malformed(_))));
    }

    #[test]
    fn rejects_non_hmac_algorithms() {
        let verifier = TokenVerifier::new(SECRET);
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(student_claims(1_700_003_600).to_string());
        let token = format!("{header}.{payload}.c2lnbmF0dXJl");

        assert_eq!(verifier.verify(&token), Err(VerificationError::UnsupportedAlgorithm));
    }

    #[test]
    fn rejects_unsigned_and_unknown_algorithms() {
        let verifier = TokenVerifier::new(SECRET);
        let payload = URL_SAFE_NO_PAD.encode(student_claims(1_700_003_600).to_string());

        for alg in ["none", "None", "XS999"] {
            let header = URL_SAFE_NO_PAD.encode(format!(r#"{{"alg":"{alg}","typ":"JWT"}}"#));
            let token = format!("{header}.{payload}.");
            assert_eq!(
                verifier.verify(&token),
                Err(VerificationError::UnsupportedAlgorithm),
                "alg {alg}"
            );
        }
    }

    #[test]
    fn header_without_alg_is_malformed() {
        let verifier = TokenVerifier::new(SECRET);
        let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(student_claims(1_700_003_600).to_string());

        let result = verifier.verify(&format!("{header}.{payload}.c2ln"));
        assert!(matches!(result, Err(VerificationError::Malformed(_))), "{result:?}");
    }

    #[test]
    fn reports_claim_shape_after_signature_check() {
        let verifier = TokenVerifier::new(SECRET);
        let token = sign(
            Algorithm::HS256,
            SECRET,
            &json!({ "expiry": 1, "issued_at": 1, "record_code": "1" }),
        );

        assert_eq!(verifier.verify(&token), Err(VerificationError::MissingClaim("role")));
    }
}
