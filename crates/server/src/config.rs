use std::{env, fs};

use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "server.toml";

const DEFAULT_DATABASE_URL: &str = "sqlite://./data/crud.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8000".into(),
            database_url: DEFAULT_DATABASE_URL.into(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Shape of `server.toml`. Every key is optional and unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
    max_body_bytes: Option<usize>,
}

impl Settings {
    /// Defaults, then `server.toml`, then environment variables. Where two
    /// variables name the same setting the `APP__` one wins.
    pub fn load() -> Self {
        let mut settings = Self::default();

        if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
            settings.apply_file(&raw);
        }

        if let Some(v) = env_override(&["SERVER_BIND", "APP__BIND_ADDR"]) {
            settings.server_bind = v;
        }
        if let Some(v) = env_override(&["DATABASE_URL", "APP__DATABASE_URL"]) {
            settings.database_url = v;
        }
        if let Some(v) = env_override(&["APP__MAX_BODY_BYTES"]) {
            match v.parse() {
                Ok(limit) => settings.max_body_bytes = limit,
                Err(_) => warn!(value = %v, "ignoring unparsable APP__MAX_BODY_BYTES"),
            }
        }

        settings
    }

    /// Layers the keys present in a `server.toml` body over `self`. An
    /// unreadable file changes nothing.
    pub fn apply_file(&mut self, raw: &str) {
        let file: FileSettings = match toml::from_str(raw) {
            Ok(file) => file,
            Err(error) => {
                warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file");
                return;
            }
        };

        if let Some(v) = file.bind_addr {
            self.server_bind = v;
        }
        if let Some(v) = file.database_url {
            self.database_url = v;
        }
        if let Some(v) = file.max_body_bytes {
            self.max_body_bytes = v;
        }
    }

    /// `database_url` as an sqlx SQLite URL; bare paths gain the scheme.
    pub fn sqlite_url(&self) -> String {
        normalize_database_url(&self.database_url)
    }
}

fn env_override(names: &[&str]) -> Option<String> {
    names.iter().filter_map(|name| env::var(name).ok()).last()
}

pub(crate) fn normalize_database_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return DEFAULT_DATABASE_URL.to_string();
    }
    if raw.starts_with("sqlite::memory:") || raw.contains("://") {
        return raw.to_string();
    }

    let path = raw.strip_prefix("sqlite:").unwrap_or(raw).replace('\\', "/");
    format!("sqlite://{path}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
