//! Error types for the Layover Fuel assistant service

use crate::types::RunStatus;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Image hosting failure (bad payload, transport or provider error)
    #[error("Image upload failed: {0}")]
    Upload(String),

    /// Request carried nothing usable
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Create/append/run/status-check failure from the assistants API
    #[error("Thread operation failed: {0}")]
    ThreadOperation(String),

    /// Run reached a terminal status other than completed
    #[error("Run ended with status {status}: {message}")]
    RunFailed { status: RunStatus, message: String },

    /// Poll budget exhausted before the run completed
    #[error("Run did not complete after {attempts} status checks")]
    Timeout { attempts: u32 },

    /// Image classification failure. Recovered locally, never surfaced.
    #[error("Classification failed: {0}")]
    Classification(String),

    /// Menu extraction failure. Recovered locally, never surfaced.
    #[error("Menu extraction failed: {0}")]
    Extraction(String),

    /// API error from the vision model
    #[error("API error: {0}")]
    Api(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new upload error
    pub fn upload(msg: impl Into<String>) -> Self {
        Error::Upload(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new thread operation error
    pub fn thread_operation(msg: impl Into<String>) -> Self {
        Error::ThreadOperation(msg.into())
    }

    /// Create a new classification error
    pub fn classification(msg: impl Into<String>) -> Self {
        Error::Classification(msg.into())
    }

    /// Create a new extraction error
    pub fn extraction(msg: impl Into<String>) -> Self {
        Error::Extraction(msg.into())
    }

    /// Create a new API error
    pub fn api(msg: impl Into<String>) -> Self {
        Error::Api(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(attempts: u32) -> Self {
        Error::Timeout { attempts }
    }

    /// HTTP status the server answers with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Upload(_)
            | Error::ThreadOperation(_)
            | Error::RunFailed { .. }
            | Error::Api(_)
            | Error::Http(_) => 502,
            Error::Timeout { .. } => 504,
            Error::Config(_) | Error::Classification(_) | Error::Extraction(_) => 500,
        }
    }

    /// Best-effort human readable message for end users.
    ///
    /// Provider errors are opaque strings, so this looks at the words of the
    /// rendered error. URLs are skipped, and a status code only counts when
    /// it directly follows `error` (`API error 429 ...`), so ids that happen
    /// to contain digits never pick a category.
    pub fn user_message(&self) -> String {
        if let Error::Validation(msg) = self {
            return msg.clone();
        }
        if let Error::Timeout { .. } = self {
            return "The assistant is taking longer than usual to respond. Please try again."
                .to_string();
        }

        let text = self.to_string().to_lowercase();
        let words: Vec<&str> = text
            .split_whitespace()
            .filter(|token| !token.contains("://"))
            .flat_map(|token| token.split(|c: char| !c.is_ascii_alphanumeric()))
            .filter(|word| !word.is_empty())
            .collect();
        let has = |word: &str| words.contains(&word);
        let has_pair = |a: &str, b: &str| words.windows(2).any(|w| w[0] == a && w[1] == b);
        let status = http_status(&words);

        if status == Some(413) || has_pair("too", "large") || has_pair("file", "size") {
            "That image is too large. Please try a smaller photo.".to_string()
        } else if status == Some(429) || has_pair("rate", "limit") {
            "Too many requests right now. Please wait a moment and try again.".to_string()
        } else if has_pair("invalid", "image")
            || has("unsupported")
            || has("format")
            || has("base64")
        {
            "That image format isn't supported. Please upload a JPEG or PNG photo.".to_string()
        } else if matches!(status, Some(500 | 502 | 503 | 504))
            || has("unavailable")
            || has("overloaded")
        {
            "The assistant service is temporarily unavailable. Please try again shortly."
                .to_string()
        } else {
            "Something went wrong while processing your message.".to_string()
        }
    }
}

/// First `error <code>` pair, as rendered by the provider clients
fn http_status(words: &[&str]) -> Option<u16> {
    words.windows(2).find_map(|w| {
        if w[0] != "error" || w[1].len() != 3 {
            return None;
        }
        w[1].parse::<u16>().ok().filter(|code| (100..=599).contains(code))
    })
}
