//! In-process fakes for the three provider seams

#![allow(dead_code)]

use async_trait::async_trait;
use layover_fuel::{
    AssistantApi, Config, Error, FileContent, ImageHost, MessageContent, MessageContentInput,
    MessageRole, Result, Run, RunStatus, ThreadMessage, VisionModel, VisionRequest,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const ASSISTANT_REPLY: &str = "That plate pairs nicely with a Syrah.";

/// Route `log` output through the test harness capture
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

pub fn test_config() -> Config {
    Config::builder()
        .api_key("sk-test")
        .assistant_id("asst_test")
        .cloud_name("demo")
        .cloud_api_key("1234")
        .cloud_api_secret("secret")
        .persona("You are a test persona.")
        .poll_interval(Duration::from_millis(1))
        .poll_max_attempts(30)
        .build()
        .expect("valid test config")
}

// ============================================================================
// ASSISTANT
// ============================================================================

/// Remote thread store. Run statuses are served in order; the last one repeats.
pub struct FakeAssistant {
    pub calls: Mutex<Vec<String>>,
    pub appended: Mutex<Vec<(String, Vec<MessageContentInput>)>>,
    pub statuses: Mutex<VecDeque<RunStatus>>,
    pub status_checks: AtomicUsize,
    messages: Mutex<Vec<ThreadMessage>>,
    next_id: AtomicUsize,
}

impl FakeAssistant {
    pub fn with_statuses(statuses: &[RunStatus]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            appended: Mutex::new(Vec::new()),
            statuses: Mutex::new(statuses.iter().copied().collect()),
            status_checks: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn completing() -> Self {
        Self::with_statuses(&[RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed])
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn push_message(&self, role: MessageRole, content: Vec<MessageContent>) -> ThreadMessage {
        let mut messages = self.messages.lock().unwrap();
        let message = ThreadMessage {
            id: self.id("msg"),
            role,
            content,
            created_at: messages.len() as i64,
        };
        messages.insert(0, message.clone());
        message
    }
}

fn to_output(part: &MessageContentInput) -> MessageContent {
    let value = match part {
        MessageContentInput::Text { text } => serde_json::json!({
            "type": "text", "text": {"value": text, "annotations": []}
        }),
        MessageContentInput::ImageUrl { image_url } => serde_json::json!({
            "type": "image_url", "image_url": {"url": image_url.url}
        }),
    };
    serde_json::from_value(value).expect("valid content part")
}

#[async_trait]
impl AssistantApi for FakeAssistant {
    async fn create_thread(&self) -> Result<String> {
        self.record("create_thread");
        Ok(self.id("thread"))
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: Vec<MessageContentInput>,
    ) -> Result<ThreadMessage> {
        self.record("create_message");
        let output = content.iter().map(to_output).collect();
        self.appended
            .lock()
            .unwrap()
            .push((thread_id.to_string(), content));
        Ok(self.push_message(MessageRole::User, output))
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        self.record("create_run");
        assert_eq!(assistant_id, "asst_test");
        self.push_message(
            MessageRole::Assistant,
            vec![to_output(&MessageContentInput::text(ASSISTANT_REPLY))],
        );
        Ok(Run {
            id: self.id("run"),
            thread_id: Some(thread_id.to_string()),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        let status = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                *statuses.front().unwrap_or(&RunStatus::Completed)
            }
        };
        let last_error = if status == RunStatus::Failed {
            serde_json::from_value(serde_json::json!({
                "code": "server_error", "message": "Sorry, something went wrong."
            }))
            .ok()
        } else {
            None
        };
        Ok(Run {
            id: run_id.to_string(),
            thread_id: Some(thread_id.to_string()),
            status,
            last_error,
        })
    }

    async fn list_messages(&self, _thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>> {
        self.record("list_messages");
        let messages = self.messages.lock().unwrap();
        Ok(messages.iter().take(limit as usize).cloned().collect())
    }

    async fn file_content(&self, file_id: &str) -> Result<FileContent> {
        self.record("file_content");
        if file_id == "missing" {
            return Err(Error::thread_operation("download file failed: API error 404"));
        }
        Ok(FileContent {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: Some("image/png".to_string()),
        })
    }
}

// ============================================================================
// IMAGE HOST
// ============================================================================

/// Uploads succeed unless the payload contains `FAIL`
#[derive(Default)]
pub struct FakeImageHost {
    pub uploads: AtomicUsize,
}

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, image_data: &str) -> Result<String> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if image_data.contains("FAIL") {
            return Err(Error::upload("Cloudinary error 400 Bad Request: Invalid image file"));
        }
        Ok(format!("https://img.test/upload_{}.png", n))
    }

    async fn delete(&self, _url: &str) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// VISION
// ============================================================================

/// Answers classification with `category` and JSON requests with `json_reply`
pub struct FakeVision {
    pub category: Result<String>,
    pub json_reply: Result<String>,
    pub requests: Mutex<Vec<VisionRequest>>,
}

impl FakeVision {
    pub fn classifying(category: &str) -> Self {
        Self {
            category: Ok(category.to_string()),
            json_reply: Err(Error::api("no JSON reply configured")),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_json(mut self, reply: &str) -> Self {
        self.json_reply = Ok(reply.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            category: Err(Error::api("API error 503 Service Unavailable")),
            json_reply: Err(Error::api("API error 503 Service Unavailable")),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

fn replay(reply: &Result<String>) -> Result<String> {
    match reply {
        Ok(text) => Ok(text.clone()),
        Err(e) => Err(Error::api(e.to_string())),
    }
}

#[async_trait]
impl VisionModel for FakeVision {
    async fn complete(&self, request: VisionRequest) -> Result<String> {
        let json = request.json_output;
        self.requests.lock().unwrap().push(request);
        if json {
            replay(&self.json_reply)
        } else {
            replay(&self.category)
        }
    }
}
