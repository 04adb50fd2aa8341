//! HTTP surface
//!
//! | Route | Handler |
//! |---|---|
//! | `POST /api/assistant/thread` | [`create_thread`] |
//! | `POST /api/assistant/message` | [`send_message`] |
//! | `GET /api/assistant/messages/:thread_id` | [`list_messages`] |
//! | `GET /api/assistant/files/:file_id/content` | [`file_content`] |
//! | `POST /api/meal-analysis` | [`meal_analysis`] |
//! | `GET /api/health` | [`health`] |

use crate::assistant::Orchestrator;
use crate::types::{MealAnalysis, NormalizedMessage};
use crate::Error;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Photos arrive base64-encoded inside JSON bodies
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
}

/// Error wrapper rendering `{error, details}` with the mapped status
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        } else {
            log::warn!("Request rejected: {}", self.0);
        }

        let body = json!({
            "error": self.0.user_message(),
            "details": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRequest {
    #[serde(default)]
    pub existing_thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadResponse {
    pub thread_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub image_data_array: Option<Vec<String>>,
}

impl MessageRequest {
    /// `imageData` and `imageDataArray` merged, blanks dropped
    pub fn images(&self) -> Vec<String> {
        self.image_data_array
            .iter()
            .flatten()
            .chain(self.image_data.iter())
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub messages: Vec<NormalizedMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRequest {
    #[serde(default)]
    pub image_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MealResponse {
    pub result: MealAnalysis,
}

/// Build the application router
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = AppState { orchestrator };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/assistant/thread", post(create_thread))
        .route("/api/assistant/message", post(send_message))
        .route("/api/assistant/messages/:thread_id", get(list_messages))
        .route("/api/assistant/files/:file_id/content", get(file_content))
        .route("/api/meal-analysis", post(meal_analysis))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `0.0.0.0:port` and serve until the process exits
pub async fn serve(port: u16, orchestrator: Arc<Orchestrator>) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(orchestrator)).await
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn create_thread(
    State(state): State<AppState>,
    body: Option<Json<ThreadRequest>>,
) -> ApiResult<Json<ThreadResponse>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let thread_id = state
        .orchestrator
        .get_or_create_thread(request.existing_thread_id.as_deref())
        .await?;
    Ok(Json(ThreadResponse { thread_id }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> ApiResult<Json<MessagesResponse>> {
    let images = request.images();
    log::info!(
        "Chat message received (text: {}, images: {})",
        request.message.as_deref().is_some_and(|m| !m.trim().is_empty()),
        images.len()
    );

    let conversation = state
        .orchestrator
        .send(
            request.thread_id.as_deref(),
            request.message.as_deref(),
            &images,
        )
        .await?;

    Ok(Json(MessagesResponse {
        thread_id: Some(conversation.thread_id),
        messages: conversation.messages,
    }))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<MessagesResponse>> {
    let messages = state.orchestrator.messages(&thread_id).await?;
    Ok(Json(MessagesResponse {
        thread_id: None,
        messages,
    }))
}

pub async fn file_content(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Response> {
    let file = state.orchestrator.file_content(&file_id).await?;
    let content_type = file
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(([(header::CONTENT_TYPE, content_type)], file.bytes).into_response())
}

pub async fn meal_analysis(
    State(state): State<AppState>,
    Json(request): Json<MealRequest>,
) -> ApiResult<Json<MealResponse>> {
    let image_data = request
        .image_data
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| Error::validation("imageData is required"))?;

    let result = state.orchestrator.analyze_meal(&image_data).await?;
    Ok(Json(MealResponse { result }))
}
