//! Thread and run orchestration
//!
//! A chat turn against the remote assistant is a fixed sequence of calls:
//!
//! ```text
//! get_or_create_thread
//!     │
//!     ├─> add_message
//!     │     ├─> upload every image (concurrently, order kept)
//!     │     ├─> classify the first uploaded image
//!     │     ├─> build the context prompt (wine list extraction when applicable)
//!     │     └─> append one user message: text part(s) + image parts
//!     │
//!     ├─> run            start the configured assistant on the thread
//!     │
//!     ├─> poll_until_complete   fixed interval, bounded attempts
//!     │
//!     └─> messages       list newest-first, normalize oldest-first
//! ```
//!
//! Nothing is shared between requests except the HTTP clients; the thread
//! id is always supplied by the caller or freshly created.

use crate::classifier::classify;
use crate::config::Config;
use crate::image_host::{CloudinaryHost, ImageHost};
use crate::meal::analyze_meal;
use crate::menu::extract_menu;
use crate::normalize::normalize;
use crate::poll::{PollConfig, poll_until};
use crate::prompt::{build_menu_prompt, build_prompt, upload_advisory};
use crate::types::{
    CreateMessageRequest, CreateRunRequest, ImageCategory, MealAnalysis, MessageContentInput,
    MessageList, MessageRole, NormalizedMessage, Run, RunStatus, Thread, ThreadMessage,
};
use crate::vision::{ChatCompletionsClient, VisionModel};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Raw bytes of a provider-hosted file
#[derive(Debug, Clone, PartialEq)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Remote assistants API surface used by the orchestrator
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create an empty thread, returning its id
    async fn create_thread(&self) -> Result<String>;

    /// Append a user message to a thread
    async fn create_message(
        &self,
        thread_id: &str,
        content: Vec<MessageContentInput>,
    ) -> Result<ThreadMessage>;

    /// Start a run of `assistant_id` on a thread
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    /// Read the current state of a run
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// List up to `limit` messages, newest first
    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>>;

    /// Download a provider-hosted file
    async fn file_content(&self, file_id: &str) -> Result<FileContent>;
}

/// OpenAI Assistants v2 REST client
pub struct AssistantsClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for AssistantsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantsClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish()
    }
}

impl AssistantsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn execute(
        &self,
        operation: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::thread_operation(format!("{} failed: {}", operation, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|e| {
                log::warn!("Failed to read error response body: {}", e);
                "Unknown error (failed to read response body)".to_string()
            });
            return Err(Error::thread_operation(format!(
                "{} failed: API error {}: {}",
                operation, status, body
            )));
        }
        Ok(response)
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        self.execute(operation, builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| {
                Error::thread_operation(format!("{} returned unexpected body: {}", operation, e))
            })
    }
}

/// Ids are interpolated into URL paths, so only provider-style ids pass
fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty()
        || id.len() > 128
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::validation(format!("Invalid {} id", kind)));
    }
    Ok(())
}

#[async_trait]
impl AssistantApi for AssistantsClient {
    async fn create_thread(&self) -> Result<String> {
        let builder = self
            .request(reqwest::Method::POST, "/threads")
            .json(&serde_json::json!({}));
        let thread: Thread = self.execute_json("create thread", builder).await?;
        Ok(thread.id)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: Vec<MessageContentInput>,
    ) -> Result<ThreadMessage> {
        validate_id("thread", thread_id)?;
        let body = CreateMessageRequest {
            role: MessageRole::User,
            content,
        };
        let builder = self
            .request(reqwest::Method::POST, &format!("/threads/{}/messages", thread_id))
            .json(&body);
        self.execute_json("add message", builder).await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        validate_id("thread", thread_id)?;
        let body = CreateRunRequest {
            assistant_id: assistant_id.to_string(),
        };
        let builder = self
            .request(reqwest::Method::POST, &format!("/threads/{}/runs", thread_id))
            .json(&body);
        self.execute_json("create run", builder).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        validate_id("thread", thread_id)?;
        validate_id("run", run_id)?;
        let builder = self.request(
            reqwest::Method::GET,
            &format!("/threads/{}/runs/{}", thread_id, run_id),
        );
        self.execute_json("check run status", builder).await
    }

    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>> {
        validate_id("thread", thread_id)?;
        let builder = self
            .request(reqwest::Method::GET, &format!("/threads/{}/messages", thread_id))
            .query(&[("order", "desc".to_string()), ("limit", limit.to_string())]);
        let list: MessageList = self.execute_json("list messages", builder).await?;
        Ok(list.data)
    }

    async fn file_content(&self, file_id: &str) -> Result<FileContent> {
        validate_id("file", file_id)?;
        let builder = self.request(reqwest::Method::GET, &format!("/files/{}/content", file_id));
        let response = self.execute("download file", builder).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::thread_operation(format!("download file failed: {}", e)))?;

        Ok(FileContent {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Thread id plus the normalized conversation after a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub thread_id: String,
    pub messages: Vec<NormalizedMessage>,
}

/// Drives one chat turn through hosting, classification and the assistant
pub struct Orchestrator {
    assistant: Arc<dyn AssistantApi>,
    images: Arc<dyn ImageHost>,
    vision: Arc<dyn VisionModel>,
    assistant_id: String,
    persona: String,
    poll: PollConfig,
    message_limit: u32,
    file_url_template: String,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("assistant_id", &self.assistant_id)
            .field("poll", &self.poll)
            .field("message_limit", &self.message_limit)
            .finish()
    }
}

impl Orchestrator {
    /// Assemble from explicit collaborators
    pub fn new(
        config: &Config,
        assistant: Arc<dyn AssistantApi>,
        images: Arc<dyn ImageHost>,
        vision: Arc<dyn VisionModel>,
    ) -> Self {
        Self {
            assistant,
            images,
            vision,
            assistant_id: config.assistant_id.clone(),
            persona: config.persona.clone(),
            poll: PollConfig::new()
                .with_max_attempts(config.poll_max_attempts)
                .with_interval(config.poll_interval),
            message_limit: config.message_limit,
            file_url_template: config.file_url_template.clone(),
        }
    }

    /// Assemble with the HTTP-backed providers
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config,
            Arc::new(AssistantsClient::new(config)?),
            Arc::new(CloudinaryHost::new(config)?),
            Arc::new(ChatCompletionsClient::new(config)?),
        ))
    }

    /// Reject a turn that has neither text nor images. Makes no network calls.
    pub fn validate_input(text: Option<&str>, images: &[String]) -> Result<()> {
        let has_text = text.is_some_and(|t| !t.trim().is_empty());
        if !has_text && images.is_empty() {
            return Err(Error::validation("A message or an image is required"));
        }
        Ok(())
    }

    /// Return `existing` unchanged when present, otherwise create a thread
    pub async fn get_or_create_thread(&self, existing: Option<&str>) -> Result<String> {
        if let Some(id) = existing.map(str::trim).filter(|id| !id.is_empty()) {
            return Ok(id.to_string());
        }
        let id = self.assistant.create_thread().await?;
        log::info!("Created thread {}", id);
        Ok(id)
    }

    /// Upload images, pick a prompt and assemble the user message content
    pub async fn build_content(
        &self,
        text: Option<&str>,
        images: &[String],
    ) -> Result<Vec<MessageContentInput>> {
        Self::validate_input(text, images)?;
        let text = text.map(str::trim).filter(|t| !t.is_empty());

        // Uploads run concurrently; join_all keeps submission order
        let uploads = join_all(images.iter().map(|image| self.images.upload(image))).await;
        let mut urls = Vec::with_capacity(uploads.len());
        for (index, upload) in uploads.into_iter().enumerate() {
            match upload {
                Ok(url) => urls.push(url),
                Err(e) => log::warn!(
                    "Image {} of {} failed to upload: {}",
                    index + 1,
                    images.len(),
                    e
                ),
            }
        }
        // Failures are only tallied; the turn goes on with what did upload
        let failed = images.len() - urls.len();

        let mut content = Vec::new();
        match urls.first() {
            // The first hosted image picks the prompt template
            Some(first) => {
                let category = classify(self.vision.as_ref(), first).await;
                let prompt = self.prompt_for(category, first, text).await;
                content.push(MessageContentInput::text(prompt));
            }
            // No image made it: plain text, verbatim
            None => {
                if let Some(text) = text {
                    content.push(MessageContentInput::text(text));
                }
            }
        }

        if failed > 0 {
            if content.is_empty() {
                return Err(Error::validation("None of the images could be processed"));
            }
            content.push(MessageContentInput::text(upload_advisory(failed, images.len())));
        }

        content.extend(urls.into_iter().map(MessageContentInput::image_url));

        if content.is_empty() {
            return Err(Error::validation("A message or an image is required"));
        }
        Ok(content)
    }

    async fn prompt_for(
        &self,
        category: ImageCategory,
        image_url: &str,
        text: Option<&str>,
    ) -> String {
        if category != ImageCategory::WineMenu {
            return build_prompt(category, text, &self.persona);
        }
        match extract_menu(self.vision.as_ref(), image_url).await {
            Ok(extraction) => build_menu_prompt(&extraction, text, &self.persona),
            Err(e) => {
                log::warn!("Wine list extraction failed, using generic prompt: {}", e);
                build_prompt(category, text, &self.persona)
            }
        }
    }

    /// Append one user message to `thread_id`
    pub async fn add_message(
        &self,
        thread_id: &str,
        text: Option<&str>,
        images: &[String],
    ) -> Result<ThreadMessage> {
        let content = self.build_content(text, images).await?;
        self.append(thread_id, content).await
    }

    async fn append(
        &self,
        thread_id: &str,
        content: Vec<MessageContentInput>,
    ) -> Result<ThreadMessage> {
        let image_parts = content.iter().filter(|p| p.is_image()).count();
        log::debug!(
            "Appending message to {} ({} parts, {} images)",
            thread_id,
            content.len(),
            image_parts
        );
        self.assistant.create_message(thread_id, content).await
    }

    /// Start the configured assistant on `thread_id`
    pub async fn run(&self, thread_id: &str) -> Result<Run> {
        let run = self.assistant.create_run(thread_id, &self.assistant_id).await?;
        log::info!("Started run {} on thread {} ({})", run.id, thread_id, run.status);
        Ok(run)
    }

    /// Wait for a run to reach a terminal status.
    ///
    /// Returns the run in whatever terminal status it reached, or
    /// [`Error::Timeout`] once the attempt budget is spent.
    pub async fn poll_until_complete(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let run = poll_until(
            &self.poll,
            || self.assistant.retrieve_run(thread_id, run_id),
            |run| run.status.is_terminal(),
        )
        .await
        .inspect_err(|e| log::error!("Run {} did not finish: {}", run_id, e))?;

        log::info!("Run {} finished with status {}", run.id, run.status);
        Ok(run)
    }

    /// Normalized, oldest-first messages of a thread
    pub async fn messages(&self, thread_id: &str) -> Result<Vec<NormalizedMessage>> {
        let raw = self
            .assistant
            .list_messages(thread_id, self.message_limit)
            .await?;
        Ok(normalize(raw, &self.file_url_template))
    }

    /// Full chat turn: thread, message, run, poll, read back
    pub async fn send(
        &self,
        thread_id: Option<&str>,
        text: Option<&str>,
        images: &[String],
    ) -> Result<Conversation> {
        // Content comes first so a rejected turn never creates a thread
        let content = self.build_content(text, images).await?;
        let thread_id = self.get_or_create_thread(thread_id).await?;
        self.append(&thread_id, content).await?;

        let run = self.run(&thread_id).await?;
        let run = self.poll_until_complete(&thread_id, &run.id).await?;

        // Polling stops on any terminal status; only `completed` has a reply to read
        if run.status != RunStatus::Completed {
            let message = run
                .last_error
                .and_then(|e| e.message.or(e.code))
                .unwrap_or_else(|| "no error details".to_string());
            return Err(Error::RunFailed {
                status: run.status,
                message,
            });
        }

        let messages = self.messages(&thread_id).await?;
        Ok(Conversation {
            thread_id,
            messages,
        })
    }

    /// Download a provider-hosted file referenced by a message
    pub async fn file_content(&self, file_id: &str) -> Result<FileContent> {
        self.assistant.file_content(file_id).await
    }

    /// Estimate macros for a meal photo
    pub async fn analyze_meal(&self, image_data: &str) -> Result<MealAnalysis> {
        analyze_meal(self.vision.as_ref(), image_data).await
    }
}
