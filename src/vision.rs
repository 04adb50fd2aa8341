//! Direct vision calls against a chat-completions endpoint
//!
//! Classification, wine list extraction and meal analysis all ask a
//! vision-capable model one question about one image and read back a single
//! text reply. [`VisionModel`] is the seam those callers depend on;
//! [`ChatCompletionsClient`] is the OpenAI-compatible implementation.

use crate::config::Config;
use crate::image_host::display_url;
use crate::types::{
    ImageDetail, OpenAIContent, OpenAIContentPart, OpenAIMessage, OpenAIRequest, OpenAIResponse,
    ResponseFormat,
};
use crate::{Error, Result};
use async_trait::async_trait;

/// One single-turn vision question
#[derive(Debug, Clone, PartialEq)]
pub struct VisionRequest {
    /// Optional system instruction
    pub system: Option<String>,

    /// User-turn text sent alongside the image
    pub prompt: String,

    /// Hosted image URL or data URL
    pub image_url: String,

    /// Resolution hint
    pub detail: ImageDetail,

    /// Reply token budget
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Ask the provider for a JSON object reply
    pub json_output: bool,
}

impl VisionRequest {
    pub fn new(prompt: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            image_url: image_url.into(),
            detail: ImageDetail::Auto,
            max_tokens: 1000,
            temperature: 0.7,
            json_output: false,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn detail(mut self, detail: ImageDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn json_output(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }
}

/// A model that answers a question about an image
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Return the model's text reply
    async fn complete(&self, request: VisionRequest) -> Result<String>;
}

/// Non-streaming `POST /chat/completions` client
pub struct ChatCompletionsClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("model", &self.model)
            .finish()
    }
}

impl ChatCompletionsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.vision_model.clone(),
        })
    }

    /// Build the wire request for a vision question
    pub fn build_request(&self, request: &VisionRequest) -> OpenAIRequest {
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: OpenAIContent::Text(system.clone()),
            });
        }

        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: OpenAIContent::Parts(vec![
                OpenAIContentPart::text(&request.prompt),
                OpenAIContentPart::image_url(&request.image_url, request.detail),
            ]),
        });

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            response_format: request.json_output.then(ResponseFormat::json_object),
        }
    }
}

#[async_trait]
impl VisionModel for ChatCompletionsClient {
    async fn complete(&self, request: VisionRequest) -> Result<String> {
        log::debug!(
            "Vision request: image {} (max_tokens: {}, json: {})",
            display_url(&request.image_url),
            request.max_tokens,
            request.json_output
        );

        let body = self.build_request(&request);
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|e| {
                log::warn!("Failed to read error response body: {}", e);
                "Unknown error (failed to read response body)".to_string()
            });
            return Err(Error::api(format!("API error {}: {}", status, body)));
        }

        let parsed: OpenAIResponse = response.json().await.map_err(Error::Http)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::api("Response contained no choices"))?;

        if choice.finish_reason.as_deref() == Some("length") {
            log::warn!("Vision reply was cut off by the token budget");
        }

        choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::api("Response contained no text"))
    }
}
