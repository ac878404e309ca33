use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, Key, PrivateCookieJar, SameSite};
use sha2::{Digest, Sha512};
use thiserror::Error;

use super::Session;

/// Largest serialized session accepted for writing. Encryption adds a nonce,
/// a tag and base64 overhead, and browsers drop cookies above 4096 bytes.
pub const MAX_SESSION_PAYLOAD: usize = 3000;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session cookie payload could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("session could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("session payload is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Stateless codec between [`Session`] values and an encrypted cookie.
///
/// Cookies are encrypted and authenticated with a key derived from the
/// configured session secret, so clients can neither read nor forge
/// attribute values.
#[derive(Clone)]
pub struct SessionStore {
    key: Key,
    cookie_name: String,
    secure: bool,
}

impl SessionStore {
    pub fn new(session_key: &str, cookie_name: impl Into<String>, secure: bool) -> Self {
        // Key::from needs 64 bytes of material; any configured secret length works.
        let material = Sha512::digest(session_key.as_bytes());

        Self {
            key: Key::from(material.as_slice()),
            cookie_name: cookie_name.into(),
            secure,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Read the session carried by the request headers.
    ///
    /// A missing cookie, or one that fails decryption, yields an empty
    /// session. A cookie that decrypts but does not hold a session map is an
    /// error.
    pub fn load(&self, headers: &HeaderMap) -> Result<Session, SessionError> {
        let jar = PrivateCookieJar::from_headers(headers, self.key.clone());

        match jar.get(&self.cookie_name) {
            Some(cookie) => serde_json::from_str(cookie.value()).map_err(SessionError::Decode),
            None => {
                if CookieJar::from_headers(headers).get(&self.cookie_name).is_some() {
                    tracing::warn!(
                        cookie = %self.cookie_name,
                        "discarding session cookie that failed decryption"
                    );
                }
                Ok(Session::new())
            }
        }
    }

    /// Encode `session` into a cookie jar ready to be merged into a response.
    pub fn save(&self, session: &Session) -> Result<PrivateCookieJar, SessionError> {
        let payload = serde_json::to_string(session).map_err(SessionError::Encode)?;
        if payload.len() > MAX_SESSION_PAYLOAD {
            return Err(SessionError::TooLarge {
                size: payload.len(),
                limit: MAX_SESSION_PAYLOAD,
            });
        }

        Ok(PrivateCookieJar::new(self.key.clone()).add(self.cookie(payload)))
    }

    /// Jar that removes the session cookie the request arrived with.
    pub fn clear(&self, headers: &HeaderMap) -> PrivateCookieJar {
        PrivateCookieJar::from_headers(headers, self.key.clone()).remove(self.cookie(String::new()))
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ACCESS_TOKEN, ROLE};
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::http::HeaderValue;
    use axum::response::IntoResponse;

    fn store() -> SessionStore {
        SessionStore::new("test-session-key", "session", false)
    }

    /// Turn the Set-Cookie header a jar would emit into request headers.
    fn request_headers(jar: PrivateCookieJar) -> HeaderMap {
        let response = (jar, ()).into_response();
        let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(pair).unwrap());
        headers
    }

    #[test]
    fn missing_cookie_yields_empty_session() {
        let session = store().load(&HeaderMap::new()).unwrap();
        assert!(session.is_empty());
    }

    #[test]
    fn saved_session_loads_back() {
        let store = store();
        let mut session = Session::new();
        session.insert(ACCESS_TOKEN, "Bearer abc");
        session.insert(ROLE, "professor");

        let headers = request_headers(store.save(&session).unwrap());
        assert_eq!(store.load(&headers).unwrap(), session);
    }

    #[test]
    fn cookie_is_http_only_and_scoped_to_root() {
        let response = (store().save(&Session::new()).unwrap(), ()).into_response();
        let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();

        assert!(set_cookie.starts_with("session="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(!set_cookie.contains("Secure"));
    }

    #[test]
    fn values_are_not_readable_by_the_client() {
        let mut session = Session::new();
        session.insert(ROLE, "professor");

        let headers = request_headers(store().save(&session).unwrap());
        let cookie = headers.get(COOKIE).unwrap().to_str().unwrap();
        assert!(!cookie.contains("professor"));
    }

    #[test]
    fn cookie_from_another_key_is_discarded() {
        let mut session = Session::new();
        session.insert(ROLE, "professor");
        let foreign = SessionStore::new("another-session-key", "session", false);

        let headers = request_headers(foreign.save(&session).unwrap());
        assert!(store().load(&headers).unwrap().is_empty());
    }

    #[test]
    fn tampered_cookie_is_discarded() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session=eyJyb2xlIjoicHJvZmVzc29yIn0"));

        assert!(store().load(&headers).unwrap().is_empty());
    }

    #[test]
    fn decrypted_garbage_is_a_decode_error() {
        let store = store();
        let jar = PrivateCookieJar::new(store.key.clone()).add(store.cookie("not a session".to_string()));

        let headers = request_headers(jar);
        assert!(matches!(store.load(&headers), Err(SessionError::Decode(_))));
    }

    #[test]
    fn oversized_sessions_are_refused() {
        let mut session = Session::new();
        session.insert(ACCESS_TOKEN, "x".repeat(MAX_SESSION_PAYLOAD));

        assert!(matches!(
            store().save(&session),
            Err(SessionError::TooLarge { limit: MAX_SESSION_PAYLOAD, .. })
        ));
    }

    #[test]
    fn clear_expires_the_incoming_cookie() {
        let store = store();
        let headers = request_headers(store.save(&Session::new()).unwrap());

        let response = (store.clear(&headers), ()).into_response();
        let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("session="));
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
