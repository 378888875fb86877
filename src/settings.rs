//! Runtime settings, layered from built-in defaults, an optional TOML file
//! and `IMAGELENS_*` environment variables

use crate::catalog::VisionModelCatalog;
use crate::config;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    /// Chat-completion endpoint the analysis client posts to
    pub endpoint: String,

    /// Value of the `HTTP-Referer` header
    pub referer: String,

    /// Value of the `X-Title` header
    pub title: String,

    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,

    /// Model used when a request does not name one. Defaults to the first
    /// catalog entry
    pub default_model: Option<String>,

    pub models: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: config::HOST.into(),
            port: config::PORT,
            endpoint: config::OPENROUTER_ENDPOINT.into(),
            referer: config::REFERER.into(),
            title: config::TITLE.into(),
            request_timeout_secs: config::REQUEST_TIMEOUT_SECS,
            max_upload_bytes: config::MAX_UPLOAD_BYTES,
            default_model: None,
            models: config::VISION_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (or `imagelens.toml` if it exists) and the
    /// environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(path) => ::config::File::with_name(path).required(true),
            None => ::config::File::with_name(config::SETTINGS_FILE).required(false),
        };

        let settings: Settings = ::config::Config::builder()
            .add_source(file)
            .add_source(environment())
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| match path {
                Some(path) => format!("failed to load settings from {}", Path::new(path).display()),
                None => "failed to load settings".to_string(),
            })?;

        settings.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be greater than zero"));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than zero"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(anyhow!("endpoint must not be empty"));
        }
        self.catalog()?;
        Ok(self)
    }

    pub fn catalog(&self) -> Result<VisionModelCatalog> {
        VisionModelCatalog::new(self.models.clone())
    }

    /// The configured default model, or the first catalog entry
    pub fn default_model(&self, catalog: &VisionModelCatalog) -> String {
        self.default_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| catalog.first())
            .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(config::ENV_PREFIX)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("models")
}
