//! Core types for the Layover Fuel assistant service
//!
//! Three families of types live here:
//!
//! - chat-completions request/response shapes used for vision calls,
//! - assistants API shapes (threads, messages, runs),
//! - domain results (image categories, menu extraction, normalized messages,
//!   meal analysis).
//!
//! Outgoing and incoming message content are separate enums because the
//! assistants API accepts `{"type":"text","text":"..."}` but returns
//! `{"type":"text","text":{"value":"..."}}`.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// IMAGE DETAIL
// ============================================================================

/// Resolution hint passed alongside image URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    High,
    #[default]
    Auto,
}

// ============================================================================
// CHAT COMPLETIONS (vision calls)
// ============================================================================

/// Content of a chat-completions message: a plain string or a list of parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIContentPart>),
}

/// One part of a multi-part chat-completions message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAIContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAIImageUrl },
}

impl OpenAIContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        OpenAIContentPart::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>, detail: ImageDetail) -> Self {
        OpenAIContentPart::ImageUrl {
            image_url: OpenAIImageUrl {
                url: url.into(),
                detail: Some(detail),
            },
        }
    }
}

/// Image reference inside a content part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

/// Chat-completions message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: OpenAIContent,
}

/// Requested output format
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

/// Non-streaming chat-completions request
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Non-streaming chat-completions response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

// ============================================================================
// ASSISTANTS API
// ============================================================================

/// Message role in a thread
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Content part sent when appending a user message
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContentInput {
    Text { text: String },
    ImageUrl { image_url: ImageUrlInput },
}

impl MessageContentInput {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContentInput::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        MessageContentInput::ImageUrl {
            image_url: ImageUrlInput {
                url: url.into(),
                detail: ImageDetail::Auto,
            },
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, MessageContentInput::ImageUrl { .. })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageUrlInput {
    pub url: String,
    pub detail: ImageDetail,
}

/// Body of `POST /threads/{id}/messages`
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest {
    pub role: MessageRole,
    pub content: Vec<MessageContentInput>,
}

/// Content part as returned by the assistants API
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextValue },
    ImageUrl { image_url: ImageUrlValue },
    ImageFile { image_file: ImageFileValue },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ImageUrlValue {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ImageFileValue {
    pub file_id: String,
}

/// A message in a remote thread
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default)]
    pub created_at: i64,
}

/// Response of `GET /threads/{id}/messages`
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub data: Vec<ThreadMessage>,
}

/// Response of `POST /threads`
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Body of `POST /threads/{id}/runs`
#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
}

/// Lifecycle status of a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the run will not change status again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One execution of the remote assistant over a thread
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

// ============================================================================
// DOMAIN RESULTS
// ============================================================================

/// What a chat photo shows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImageCategory {
    WineMenu,
    MealPhoto,
    WineBottle,
    Other,
}

impl ImageCategory {
    pub const ALL: [ImageCategory; 4] = [
        ImageCategory::WineMenu,
        ImageCategory::MealPhoto,
        ImageCategory::WineBottle,
        ImageCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageCategory::WineMenu => "wine_menu",
            ImageCategory::MealPhoto => "meal_photo",
            ImageCategory::WineBottle => "wine_bottle",
            ImageCategory::Other => "other",
        }
    }
}

impl fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured reading of a wine list photo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MenuExtraction {
    #[serde(default)]
    pub restaurant_name: Option<String>,
    #[serde(default)]
    pub sections: Vec<MenuSection>,
    #[serde(default)]
    pub total_wine_count: usize,
}

impl MenuExtraction {
    pub fn wine_count(&self) -> usize {
        self.sections.iter().map(|s| s.wines.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MenuSection {
    #[serde(default)]
    pub section_name: String,
    #[serde(default)]
    pub wines: Vec<WineEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WineEntry {
    #[serde(default)]
    pub producer: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub vintage: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub bin: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub glass_price: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub bottle_price: Option<String>,
}

/// Models return vintages, bin numbers and prices as either strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Caller-facing flattened message
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    pub id: String,
    pub role: MessageRole,
    pub texts: Vec<String>,
    pub image_refs: Vec<String>,
}

/// Macro estimate for a meal photo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MacroEstimate {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

/// Result of `POST /api/meal-analysis`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    #[serde(default)]
    pub estimate: MacroEstimate,
    #[serde(default)]
    pub food_items: Vec<String>,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub suggestions: String,
}
