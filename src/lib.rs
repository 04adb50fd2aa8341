//! # Layover Fuel assistant service
//!
//! Backend for the chat assistant of a travel nutrition and fitness app.
//! A chat turn may carry text, photos, or both; photos are hosted, classified
//! and turned into a category-specific instruction prompt before the turn is
//! handed to a remote assistant thread.
//!
//! ## Request Flow
//!
//! ```text
//! caller
//!   │
//!   ├─> image_host   upload each photo, get a public URL
//!   ├─> classifier   first photo → wine_menu | meal_photo | wine_bottle | other
//!   ├─> menu         wine_menu only: itemized JSON transcription (best effort)
//!   ├─> prompt       category template + user text
//!   ├─> assistant    append message, start run, poll to completion
//!   └─> normalize    newest-first provider messages → oldest-first list
//! ```
//!
//! Classification and extraction never fail a request: they fall back to
//! `other` and to the generic wine-list template respectively.
//!
//! ## Example
//!
//! ```rust,no_run
//! use layover_fuel::{Config, Orchestrator};
//!
//! # async fn example() -> layover_fuel::Result<()> {
//! let config = Config::from_env()?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//!
//! let images = vec!["data:image/png;base64,iVBORw0KGgo=".to_string()];
//! let conversation = orchestrator
//!     .send(None, Some("what wine pairs with this?"), &images)
//!     .await?;
//!
//! for message in &conversation.messages {
//!     println!("{:?}: {}", message.role, message.texts.join("\n"));
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// Thread/run orchestration and the assistants API client.
mod assistant;

/// Image classification into the fixed category set.
mod classifier;

/// Environment-driven service configuration.
mod config;

/// Error types and HTTP status mapping.
mod error;

/// Image payload validation and Cloudinary hosting.
mod image_host;

/// Meal photo macro estimation.
mod meal;

/// Wine list extraction.
mod menu;

/// Provider message flattening.
mod normalize;

/// Category-specific context prompts.
mod prompt;

/// Wire and domain types.
mod types;

/// Direct vision calls.
mod vision;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

/// Bounded fixed-interval polling.
pub mod poll;

/// axum router and handlers.
pub mod server;

pub use assistant::{AssistantApi, AssistantsClient, Conversation, FileContent, Orchestrator};

pub use classifier::{classify, parse_category};

pub use config::{
    Config, ConfigBuilder, DEFAULT_BASE_URL, DEFAULT_FILE_URL_TEMPLATE, DEFAULT_PERSONA,
};

pub use error::{Error, Result};

pub use image_host::{CloudinaryHost, ImageHost, ImagePayload, public_id_from_url, sign_params};

pub use meal::{analyze_meal, parse_meal_analysis};

pub use menu::{extract_menu, parse_extraction};

pub use normalize::normalize;

pub use prompt::{build_menu_prompt, build_prompt, render_menu, upload_advisory};

pub use types::{
    ImageCategory, ImageDetail, MacroEstimate, MealAnalysis, MenuExtraction, MenuSection,
    MessageContent, MessageContentInput, MessageRole, NormalizedMessage, Run, RunError, RunStatus,
    ThreadMessage, WineEntry,
};

pub use vision::{ChatCompletionsClient, VisionModel, VisionRequest};
