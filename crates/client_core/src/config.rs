use std::{path::Path, time::Duration};

use config::{Config, Environment, File};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// `CRUD__BASE_URL`, `CRUD__REQUEST_TIMEOUT_SECS`.
pub const ENV_PREFIX: &str = "CRUD";
/// Looked up as `crud-client.{toml,json,yaml,...}` in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "crud-client";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Backend origin; resources live under `{base_url}/api/{resource}/`.
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Layers defaults, an optional config file and `CRUD__*` environment
    /// variables. An explicit `path` must exist; the default file may not.
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    pub(crate) fn load_with_env_prefix(
        path: Option<&Path>,
        env_prefix: &str,
    ) -> Result<Self, ClientError> {
        let file = match path {
            Some(path) => File::from(path.to_path_buf()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)
            .and_then(|builder| {
                builder.set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)
            })
            .map_err(config_error)?
            .add_source(file)
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(config_error)?;

        let config: Self = settings.try_deserialize().map_err(config_error)?;
        config.validate()?;
        debug!(base_url = %config.base_url, timeout_secs = config.request_timeout_secs, "client config loaded");
        Ok(config)
    }

    /// Rejects settings no request could succeed with.
    pub fn validate(&self) -> Result<(), ClientError> {
        self.origin()?;
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed origin, always ending in `/` so relative joins keep any path
    /// prefix the backend is mounted under.
    pub fn origin(&self) -> Result<Url, ClientError> {
        let raw = self.base_url.trim();
        let mut url = Url::parse(raw)
            .map_err(|err| ClientError::Config(format!("base_url '{raw}': {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "base_url '{raw}' must use http or https"
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// `{origin}/api/{resource}/`
    pub fn resource_url(&self, resource: &str) -> Result<Url, ClientError> {
        let relative = format!("api/{resource}/");
        self.origin()?
            .join(&relative)
            .map_err(|err| ClientError::Config(format!("resource '{resource}': {err}")))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn http_client(&self) -> Result<Client, ClientError> {
        self.validate()?;
        Client::builder()
            .timeout(self.request_timeout())
            .build()
            .map_err(|err| ClientError::Config(format!("http client: {err}")))
    }
}

fn config_error(err: config::ConfigError) -> ClientError {
    ClientError::Config(err.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
