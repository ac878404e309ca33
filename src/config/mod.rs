use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEV_JWT_SECRET: &str = "development-jwt-secret";
const DEV_SESSION_KEY: &str = "development-session-key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared HMAC secret the backend signs access tokens with
    pub jwt_secret: String,
    /// Secret the session cookie encryption key is derived from
    pub session_key: String,
    pub session_cookie_name: String,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Build the configuration for this process: environment preset, then the
    /// optional YAML file, then environment variables, then validation.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| env::var(key).ok();

        let mut config = Self::preset(Environment::from_name(lookup("APP_ENV").as_deref()));
        if let Some(path) = file {
            let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            config = config.merge_yaml(&contents)?;
        }

        let config = config.with_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    /// Overlay a YAML document onto this config. Sections and keys missing
    /// from the document keep their current values.
    pub fn merge_yaml(self, contents: &str) -> Result<Self, ConfigError> {
        let overlay: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut base = serde_yaml::to_value(&self)?;
        merge_values(&mut base, overlay);
        Ok(serde_yaml::from_value(base)?)
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Server overrides
        if let Some(v) = lookup("SERVER_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup("SERVER_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("SESSION_KEY") {
            self.security.session_key = v;
        }
        if let Some(v) = lookup("SESSION_COOKIE_NAME") {
            self.security.session_cookie_name = v;
        }
        if let Some(v) = lookup("SESSION_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }

        // Backend overrides
        if let Some(v) = lookup("BACKEND_BASE_URL") {
            self.backend.base_url = v;
        }
        if let Some(v) = lookup("BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = v.parse().unwrap_or(self.backend.timeout_secs);
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("security.jwt_secret must be set".into()));
        }
        if self.security.session_key.is_empty() {
            return Err(ConfigError::Invalid("security.session_key must be set".into()));
        }
        if self.security.session_cookie_name.is_empty() {
            return Err(ConfigError::Invalid("security.session_cookie_name must not be empty".into()));
        }
        if self.environment == Environment::Production
            && (self.security.jwt_secret == DEV_JWT_SECRET || self.security.session_key == DEV_SESSION_KEY)
        {
            return Err(ConfigError::Invalid(
                "development secrets cannot be used in production".into(),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("server.request_timeout_secs must be positive".into()));
        }

        let url = Url::parse(&self.backend.base_url)
            .map_err(|e| ConfigError::Invalid(format!("backend.base_url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "backend.base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind_addr: "127.0.0.1:8080".to_string(),
                request_timeout_secs: 120,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                session_key: DEV_SESSION_KEY.to_string(),
                session_cookie_name: "session".to_string(),
                secure_cookies: false,
            },
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 10,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                bind_addr: "0.0.0.0:8080".to_string(),
                request_timeout_secs: 120,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                session_key: String::new(),
                session_cookie_name: "session".to_string(),
                secure_cookies: true,
            },
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 10,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                bind_addr: "0.0.0.0:8080".to_string(),
                request_timeout_secs: 120,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                session_key: String::new(),
                session_cookie_name: "session".to_string(),
                secure_cookies: true,
            },
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 5,
            },
        }
    }
}

impl Environment {
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

fn merge_values(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        // An empty document parses as null and leaves everything as is
        (_, serde_yaml::Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}
