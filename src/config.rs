//! Configuration for the Layover Fuel assistant service
//!
//! Settings come from the environment via [`Config::from_env`] or are
//! assembled directly with [`Config::builder`] (tests, embedding).

use crate::{Error, Result};
use std::env;
use std::time::Duration;

/// Default OpenAI-compatible endpoint for both the assistants and vision calls
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Cloudinary API root
pub const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Default vision-capable model used for classification, extraction and meal analysis
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// Default Cloudinary folder for chat uploads
pub const DEFAULT_UPLOAD_FOLDER: &str = "layover-fuel/chat";

/// Where `image_file` references resolve to. `{file_id}` is substituted.
pub const DEFAULT_FILE_URL_TEMPLATE: &str = "/api/assistant/files/{file_id}/content";

/// Persona used when none is configured
pub const DEFAULT_PERSONA: &str = "You are the in-app assistant for a travel nutrition and fitness app. \
You help travelers eat well, train consistently and choose drinks sensibly while on the road.";

/// Service configuration
#[derive(Clone)]
pub struct Config {
    /// API key for the assistants and vision endpoints
    pub api_key: String,

    /// OpenAI-compatible endpoint URL
    pub base_url: String,

    /// Identifier of the remote assistant runs are started against
    pub assistant_id: String,

    /// Model used for direct vision calls
    pub vision_model: String,

    /// Persona prefix for every context prompt
    pub persona: String,

    /// Cloudinary cloud name
    pub cloud_name: String,

    /// Cloudinary API key
    pub cloud_api_key: String,

    /// Cloudinary API secret, used for upload signatures
    pub cloud_api_secret: String,

    /// Cloudinary API root
    pub cloudinary_base_url: String,

    /// Folder uploads are namespaced under
    pub upload_folder: String,

    /// Transport timeout applied to every outbound HTTP call
    pub timeout: Duration,

    /// Delay between run status checks
    pub poll_interval: Duration,

    /// Maximum run status checks before giving up
    pub poll_max_attempts: u32,

    /// How many thread messages to fetch when listing
    pub message_limit: u32,

    /// Template for resolving `image_file` handles
    pub file_url_template: String,

    /// Port the HTTP server binds to
    pub port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("assistant_id", &self.assistant_id)
            .field("vision_model", &self.vision_model)
            .field("persona", &format!("{} chars", self.persona.len()))
            .field("cloud_name", &self.cloud_name)
            .field("cloud_api_key", &"***")
            .field("cloud_api_secret", &"***")
            .field("cloudinary_base_url", &self.cloudinary_base_url)
            .field("upload_folder", &self.upload_folder)
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("message_limit", &self.message_limit)
            .field("file_url_template", &self.file_url_template)
            .field("port", &self.port)
            .finish()
    }
}

impl Config {
    /// Create a new builder for Config
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from the process environment
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `ASSISTANT_API_KEY` (or `OPENAI_API_KEY`) | required |
    /// | `ASSISTANT_BASE_URL` | `https://api.openai.com/v1` |
    /// | `ASSISTANT_ID` | required |
    /// | `VISION_MODEL` | `gpt-4o` |
    /// | `ASSISTANT_PERSONA` | neutral persona |
    /// | `CLOUDINARY_CLOUD_NAME` / `_API_KEY` / `_API_SECRET` | required |
    /// | `CLOUDINARY_BASE_URL` | `https://api.cloudinary.com/v1_1` |
    /// | `CLOUDINARY_FOLDER` | `layover-fuel/chat` |
    /// | `PORT` | `5000` |
    pub fn from_env() -> Result<Config> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut builder = Config::builder();
        if let Some(key) = get("ASSISTANT_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            builder = builder.api_key(key);
        }
        if let Some(url) = get("ASSISTANT_BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Some(id) = get("ASSISTANT_ID") {
            builder = builder.assistant_id(id);
        }
        if let Some(model) = get("VISION_MODEL") {
            builder = builder.vision_model(model);
        }
        if let Some(persona) = get("ASSISTANT_PERSONA") {
            builder = builder.persona(persona);
        }
        if let Some(name) = get("CLOUDINARY_CLOUD_NAME") {
            builder = builder.cloud_name(name);
        }
        if let Some(key) = get("CLOUDINARY_API_KEY") {
            builder = builder.cloud_api_key(key);
        }
        if let Some(secret) = get("CLOUDINARY_API_SECRET") {
            builder = builder.cloud_api_secret(secret);
        }
        if let Some(url) = get("CLOUDINARY_BASE_URL") {
            builder = builder.cloudinary_base_url(url);
        }
        if let Some(folder) = get("CLOUDINARY_FOLDER") {
            builder = builder.upload_folder(folder);
        }
        if let Some(port) = get("PORT") {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::config(format!("PORT is not a valid port: {port}")))?;
            builder = builder.port(port);
        }

        builder.build()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    assistant_id: Option<String>,
    vision_model: Option<String>,
    persona: Option<String>,
    cloud_name: Option<String>,
    cloud_api_key: Option<String>,
    cloud_api_secret: Option<String>,
    cloudinary_base_url: Option<String>,
    upload_folder: Option<String>,
    timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    poll_max_attempts: Option<u32>,
    message_limit: Option<u32>,
    file_url_template: Option<String>,
    port: Option<u16>,
}

impl ConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn assistant_id(mut self, id: impl Into<String>) -> Self {
        self.assistant_id = Some(id.into());
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    pub fn cloud_name(mut self, name: impl Into<String>) -> Self {
        self.cloud_name = Some(name.into());
        self
    }

    pub fn cloud_api_key(mut self, key: impl Into<String>) -> Self {
        self.cloud_api_key = Some(key.into());
        self
    }

    pub fn cloud_api_secret(mut self, secret: impl Into<String>) -> Self {
        self.cloud_api_secret = Some(secret.into());
        self
    }

    pub fn cloudinary_base_url(mut self, url: impl Into<String>) -> Self {
        self.cloudinary_base_url = Some(url.into());
        self
    }

    pub fn upload_folder(mut self, folder: impl Into<String>) -> Self {
        self.upload_folder = Some(folder.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn poll_max_attempts(mut self, attempts: u32) -> Self {
        self.poll_max_attempts = Some(attempts);
        self
    }

    pub fn message_limit(mut self, limit: u32) -> Self {
        self.message_limit = Some(limit);
        self
    }

    pub fn file_url_template(mut self, template: impl Into<String>) -> Self {
        self.file_url_template = Some(template.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn build(self) -> Result<Config> {
        let api_key = self
            .api_key
            .ok_or_else(|| Error::config("ASSISTANT_API_KEY is required"))?;

        let assistant_id = self
            .assistant_id
            .ok_or_else(|| Error::config("ASSISTANT_ID is required"))?;

        let cloud_name = self
            .cloud_name
            .ok_or_else(|| Error::config("CLOUDINARY_CLOUD_NAME is required"))?;

        let cloud_api_key = self
            .cloud_api_key
            .ok_or_else(|| Error::config("CLOUDINARY_API_KEY is required"))?;

        let cloud_api_secret = self
            .cloud_api_secret
            .ok_or_else(|| Error::config("CLOUDINARY_API_SECRET is required"))?;

        let poll_max_attempts = self.poll_max_attempts.unwrap_or(30);
        if poll_max_attempts == 0 {
            return Err(Error::config("poll_max_attempts must be at least 1"));
        }

        Ok(Config {
            api_key,
            base_url: trim_url(self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string())),
            assistant_id,
            vision_model: self
                .vision_model
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            persona: self.persona.unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            cloud_name,
            cloud_api_key,
            cloud_api_secret,
            cloudinary_base_url: trim_url(
                self.cloudinary_base_url
                    .unwrap_or_else(|| DEFAULT_CLOUDINARY_BASE_URL.to_string()),
            ),
            upload_folder: self
                .upload_folder
                .unwrap_or_else(|| DEFAULT_UPLOAD_FOLDER.to_string()),
            timeout: self.timeout.unwrap_or(Duration::from_secs(120)),
            poll_interval: self.poll_interval.unwrap_or(Duration::from_secs(1)),
            poll_max_attempts,
            message_limit: self.message_limit.unwrap_or(100),
            file_url_template: self
                .file_url_template
                .unwrap_or_else(|| DEFAULT_FILE_URL_TEMPLATE.to_string()),
            port: self.port.unwrap_or(5000),
        })
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
