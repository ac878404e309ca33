use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use super::{
    BackendApi, BackendError, Credentials, ProfileInformation, RecordCode, Registration, RoleOption, Tokens,
};

const LOGIN_ENDPOINT: &str = "api/login";
const USERNAME_ENDPOINT: &str = "api/get_username";
const ROLES_ENDPOINT: &str = "api/roles";
const SIGNUP_ENDPOINT: &str = "api/signup";

/// [`BackendApi`] over plain HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.base_url.join(path)?)
    }

    /// Send `request` and insist on `expected` as the response status.
    async fn send(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
        expected: StatusCode,
    ) -> Result<reqwest::Response, BackendError> {
        let response = request.send().await?;

        let status = response.status();
        if status != expected {
            return Err(BackendError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn post_json<B, T>(&self, endpoint: &'static str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(endpoint)?;
        tracing::debug!("POST {}", url);

        let response = self
            .send(endpoint, self.client.post(url).json(body), StatusCode::OK)
            .await?;
        decode(endpoint, response).await
    }
}

async fn decode<T: DeserializeOwned>(endpoint: &'static str, response: reqwest::Response) -> Result<T, BackendError> {
    response
        .json::<T>()
        .await
        .map_err(|source| BackendError::Decode { endpoint, source })
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Tokens, BackendError> {
        self.post_json(LOGIN_ENDPOINT, credentials).await
    }

    async fn username(&self, record_code: i64) -> Result<ProfileInformation, BackendError> {
        self.post_json(USERNAME_ENDPOINT, &RecordCode { code: record_code })
            .await
    }

    async fn roles(&self) -> Result<Vec<RoleOption>, BackendError> {
        let url = self.endpoint(ROLES_ENDPOINT)?;
        tracing::debug!("GET {}", url);

        let response = self
            .send(ROLES_ENDPOINT, self.client.get(url), StatusCode::OK)
            .await?;
        decode(ROLES_ENDPOINT, response).await
    }

    async fn signup(&self, registration: &Registration) -> Result<(), BackendError> {
        let url = self.endpoint(SIGNUP_ENDPOINT)?;
        tracing::debug!("POST {}", url);

        // The body of a 201 is not used
        self.send(SIGNUP_ENDPOINT, self.client.post(url).json(registration), StatusCode::CREATED)
            .await?;
        Ok(())
    }
}
