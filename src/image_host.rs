//! Image ingestion and hosting
//!
//! Chat photos arrive from the browser as data URLs (or bare base64). The
//! assistants API only accepts fetchable URLs, so every photo is first pushed
//! to Cloudinary and the returned `secure_url` is what flows through the rest
//! of the pipeline.

use crate::config::Config;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use sha1::{Digest, Sha1};

/// MIME type assumed for bare base64 payloads
const DEFAULT_MIME: &str = "image/jpeg";

/// Payloads above this size are accepted but logged
const LARGE_PAYLOAD_WARN_BYTES: usize = 10 * 1024 * 1024;

/// A validated base64 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime_type: String,
    data: String,
}

impl ImagePayload {
    /// Parse a `data:<mime>;base64,<payload>` URL or a bare base64 payload.
    ///
    /// Bare payloads are assumed to be JPEG.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::upload("Image data is empty"));
        }

        let (mime_type, data) = match input.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest
                    .split_once(',')
                    .ok_or_else(|| Error::upload("Invalid image data URL: missing ','"))?;
                let mut params = header.split(';');
                let mime_type = params.next().unwrap_or_default().trim().to_lowercase();
                if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                    return Err(Error::upload("Invalid image data URL: not base64 encoded"));
                }
                (mime_type, data)
            }
            None => (DEFAULT_MIME.to_string(), input),
        };

        validate_mime_type(&mime_type)?;

        if data.is_empty() {
            return Err(Error::upload("Image data is empty"));
        }
        STANDARD
            .decode(data)
            .map_err(|e| Error::upload(format!("Invalid base64 image data: {}", e)))?;

        if data.len() > LARGE_PAYLOAD_WARN_BYTES {
            log::warn!(
                "Large image payload ({} bytes of base64), upload may be slow",
                data.len()
            );
        }

        Ok(Self {
            mime_type,
            data: data.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn base64(&self) -> &str {
        &self.data
    }

    /// Render as a `data:` URL
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

fn validate_mime_type(mime_type: &str) -> Result<()> {
    let Some(subtype) = mime_type.strip_prefix("image/") else {
        return Err(Error::upload(format!(
            "Unsupported MIME type '{}': only image/* is accepted",
            mime_type
        )));
    };
    if subtype.is_empty()
        || !subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return Err(Error::upload(format!(
            "Invalid character in MIME type '{}'",
            mime_type.escape_debug()
        )));
    }
    Ok(())
}

/// Shorten long URLs (data URLs in particular) for log output
pub(crate) fn display_url(url: &str) -> String {
    if url.len() > 100 {
        let cut = (0..=100).rev().find(|i| url.is_char_boundary(*i)).unwrap_or(0);
        format!("{}... ({} chars)", &url[..cut], url.len())
    } else {
        url.to_string()
    }
}

/// Durable public hosting for chat images
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload a data URL or bare base64 image, returning its public URL
    async fn upload(&self, image_data: &str) -> Result<String>;

    /// Best-effort removal of a previously uploaded image
    async fn delete(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    #[serde(default)]
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorMessage,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

/// Cloudinary signed-upload client
pub struct CloudinaryHost {
    http_client: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

impl std::fmt::Debug for CloudinaryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryHost")
            .field("base_url", &self.base_url)
            .field("cloud_name", &self.cloud_name)
            .field("folder", &self.folder)
            .finish()
    }
}

impl CloudinaryHost {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            http_client,
            base_url: config.cloudinary_base_url.clone(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.cloud_api_key.clone(),
            api_secret: config.cloud_api_secret.clone(),
            folder: config.upload_folder.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.base_url, self.cloud_name, action)
    }

    async fn post_signed(
        &self,
        action: &str,
        mut params: Vec<(&'static str, String)>,
        extra: Vec<(&'static str, String)>,
    ) -> Result<reqwest::Response> {
        let signature = sign_params(&params, &self.api_secret);
        params.extend(extra);
        params.push(("api_key", self.api_key.clone()));
        params.push(("signature", signature));

        let response = self
            .http_client
            .post(self.endpoint(action))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::upload(format!("Cloudinary request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|e| {
                log::warn!("Failed to read Cloudinary error body: {}", e);
                String::new()
            });
            let message = serde_json::from_str::<CloudinaryErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(Error::upload(format!("Cloudinary error {}: {}", status, message)));
        }

        Ok(response)
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, image_data: &str) -> Result<String> {
        let payload = ImagePayload::parse(image_data)?;
        let public_id = unique_public_id();
        let timestamp = chrono::Utc::now().timestamp().to_string();

        log::debug!(
            "Uploading {} image to folder '{}' as {}",
            payload.mime_type(),
            self.folder,
            public_id
        );

        let params = vec![
            ("folder", self.folder.clone()),
            ("public_id", public_id),
            ("timestamp", timestamp),
        ];
        let response = self
            .post_signed("upload", params, vec![("file", payload.to_data_url())])
            .await?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::upload(format!("Unexpected Cloudinary response: {}", e)))?;

        log::info!(
            "Uploaded image {} -> {}",
            body.public_id.as_deref().unwrap_or("?"),
            display_url(&body.secure_url)
        );
        Ok(body.secure_url)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let public_id = public_id_from_url(url)?;
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let params = vec![("public_id", public_id.clone()), ("timestamp", timestamp)];
        let response = self.post_signed("destroy", params, Vec::new()).await?;

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| Error::upload(format!("Unexpected Cloudinary response: {}", e)))?;
        if body.result != "ok" {
            log::warn!("Cloudinary destroy of {} returned '{}'", public_id, body.result);
        }
        Ok(())
    }
}

/// Time-based identifier, unique enough for concurrent uploads in one millisecond
fn unique_public_id() -> String {
    format!(
        "chat_{}_{:06}",
        chrono::Utc::now().timestamp_millis(),
        rand::random::<u32>() % 1_000_000
    )
}

/// Cloudinary request signature: SHA-1 over the sorted `k=v&...` string with
/// the API secret appended.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Recover the public id (folder path, no version, no extension) from a delivery URL
pub fn public_id_from_url(url: &str) -> Result<String> {
    let (_, path) = url
        .split_once("/upload/")
        .ok_or_else(|| Error::upload(format!("Not a Cloudinary delivery URL: {}", url)))?;

    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = match path.split_once('/') {
        Some((version, rest))
            if version.len() > 1
                && version.starts_with('v')
                && version[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest
        }
        _ => path,
    };
    let public_id = match path.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => path,
    };

    if public_id.is_empty() {
        return Err(Error::upload(format!("No public id in URL: {}", url)));
    }
    Ok(public_id.to_string())
}
