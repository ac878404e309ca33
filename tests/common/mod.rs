#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use axum::Router;
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use sha2::{Digest, Sha512};
use tower::ServiceExt;

use deanery_gateway::auth::TokenVerifier;
use deanery_gateway::backend::{
    BackendApi, BackendError, Credentials, ProfileInformation, Registration, RoleOption, Tokens,
};
use deanery_gateway::session::{Session, SessionStore, ACCESS_TOKEN};
use deanery_gateway::{router, AppState};

pub const JWT_SECRET: &str = "integration-jwt-secret";
pub const SESSION_KEY: &str = "integration-session-key";
pub const COOKIE_NAME: &str = "session";
pub const PASSWORD: &str = "correct-horse";
/// Record code the stub backend fails on with a 503
pub const UNAVAILABLE_RECORD_CODE: i64 = 500;
/// Email the stub backend treats as already registered
pub const TAKEN_EMAIL: &str = "taken@example.org";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn claims(record_code: &str, role: &str, expiry: i64) -> Value {
    json!({
        "expiry": expiry,
        "issued_at": now(),
        "record_code": record_code,
        "role": role,
    })
}

pub fn mint_token(secret: &str, claims: &Value) -> String {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("failed to sign test token")
}

/// Backend stand-in: accepts PASSWORD for any record code and knows everyone
/// as "Ada Lovelace".
pub struct StubBackend;

#[async_trait]
impl BackendApi for StubBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Tokens, BackendError> {
        if credentials.record_code == UNAVAILABLE_RECORD_CODE {
            return Err(BackendError::Status {
                endpoint: "api/login",
                status: 503,
            });
        }
        if credentials.password != PASSWORD {
            return Err(BackendError::Status {
                endpoint: "api/login",
                status: 401,
            });
        }

        let code = credentials.record_code.to_string();
        Ok(Tokens {
            access_token: mint_token(JWT_SECRET, &claims(&code, "student", now() + 3600)),
            refresh_token: None,
        })
    }

    async fn username(&self, record_code: i64) -> Result<ProfileInformation, BackendError> {
        Ok(ProfileInformation {
            user_name: "Ada Lovelace".to_string(),
            record_code,
        })
    }

    async fn roles(&self) -> Result<Vec<RoleOption>, BackendError> {
        Ok(vec![json!({ "role": "student" }), json!({ "role": "professor" })])
    }

    async fn signup(&self, registration: &Registration) -> Result<(), BackendError> {
        if registration.email == TAKEN_EMAIL {
            return Err(BackendError::Status {
                endpoint: "api/signup",
                status: 409,
            });
        }
        Ok(())
    }
}

pub fn session_store() -> SessionStore {
    SessionStore::new(SESSION_KEY, COOKIE_NAME, false)
}

pub fn test_app() -> Router {
    let state = AppState::new(TokenVerifier::new(JWT_SECRET), session_store(), Arc::new(StubBackend));
    router(state)
}

/// `Cookie` header value carrying `session`, encrypted with the test key.
pub fn cookie_for(session: &Session) -> String {
    let jar = session_store().save(session).expect("failed to encode test session");
    let response = (jar, ()).into_response();
    session_cookie(&response).expect("jar did not emit a session cookie")
}

/// Cookie for a session holding a valid, unexpired token.
pub fn signed_in_cookie(record_code: &str, role: &str) -> String {
    let token = mint_token(JWT_SECRET, &claims(record_code, role, now() + 3600));
    cookie_with_bearer(&format!("Bearer {token}"))
}

pub fn cookie_with_bearer(bearer: &str) -> String {
    let mut session = Session::new();
    session.insert(ACCESS_TOKEN, bearer);
    cookie_for(&session)
}

/// Cookie that decrypts with the gateway key but does not hold a session map.
pub fn undecodable_session_cookie() -> String {
    let key = Key::from(Sha512::digest(SESSION_KEY.as_bytes()).as_slice());
    let jar = PrivateCookieJar::new(key).add(Cookie::new(COOKIE_NAME, "[1,2,3]"));
    session_cookie(&(jar, ()).into_response()).expect("jar did not emit a session cookie")
}

/// `name=value` part of the session Set-Cookie header, if the response has one.
pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{COOKIE_NAME}=")))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

/// Decode the session a response wrote back to the browser.
pub fn session_from(response: &Response<Body>) -> Option<Session> {
    let cookie = session_cookie(response)?;
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(COOKIE, cookie.parse().ok()?);
    session_store().load(&headers).ok()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("router is infallible")
}

pub async fn body_json(response: Response<Body>) -> anyhow::Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
