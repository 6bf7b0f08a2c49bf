use std::{fs, path::Path};

use thiserror::Error;
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "storefront.toml";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url: String,
    pub page_size: u32,
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080/api".into(),
            page_size: DEFAULT_PAGE_SIZE,
            auth_token: None,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api url '{url}': {source}")]
    InvalidApiUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("api url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    #[error("request timeout must be at least one second")]
    InvalidRequestTimeout,
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ClientSettings {
    pub fn api_base(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.api_url.trim()).map_err(|source| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(ConfigError::UnsupportedScheme(self.api_url.clone())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }
        self.api_base()?;
        Ok(())
    }
}

/// Loads settings from `storefront.toml` in the working directory and the process environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file (if readable), then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<toml::Table>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("STOREFRONT_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("APP__PAGE_SIZE") {
        if let Some(parsed) = parse_number("APP__PAGE_SIZE", &v) {
            settings.page_size = parsed;
        }
    }

    if let Some(v) = env("STOREFRONT_AUTH_TOKEN") {
        settings.auth_token = non_empty(v);
    }
    if let Some(v) = env("APP__AUTH_TOKEN") {
        settings.auth_token = non_empty(v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Some(parsed) = parse_number("APP__REQUEST_TIMEOUT_SECS", &v) {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}

fn apply_file(settings: &mut ClientSettings, file_cfg: &toml::Table) {
    if let Some(v) = file_value(file_cfg, "api_url") {
        settings.api_url = v;
    }
    if let Some(v) = file_value(file_cfg, "page_size") {
        if let Some(parsed) = parse_number("page_size", &v) {
            settings.page_size = parsed;
        }
    }
    if let Some(v) = file_value(file_cfg, "auth_token") {
        settings.auth_token = non_empty(v);
    }
    if let Some(v) = file_value(file_cfg, "request_timeout_secs") {
        if let Some(parsed) = parse_number("request_timeout_secs", &v) {
            settings.request_timeout_secs = parsed;
        }
    }
}

fn file_value(file_cfg: &toml::Table, key: &str) -> Option<String> {
    match file_cfg.get(key)? {
        toml::Value::String(v) => Some(v.clone()),
        toml::Value::Integer(v) => Some(v.to_string()),
        other => {
            warn!(key, value = %other, "unsupported settings value");
            None
        }
    }
}

fn parse_number<N: std::str::FromStr>(key: &str, raw: &str) -> Option<N> {
    match raw.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value = raw, "ignoring non-numeric setting");
            None
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
