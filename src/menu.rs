//! Wine list extraction
//!
//! Only runs for photos classified as `wine_menu`. A second, high-detail
//! vision request asks for every wine on the list as JSON; the result
//! replaces the generic wine-menu instructions. Callers treat any error as
//! "use the generic template".

use crate::types::{ImageDetail, MenuExtraction};
use crate::vision::{VisionModel, VisionRequest};
use crate::{Error, Result};

const EXTRACTION_SYSTEM_PROMPT: &str = "You are a meticulous sommelier's assistant transcribing a restaurant \
wine list from a photo. List EVERY wine that is legible, in the order it appears, grouped under the \
section headings used on the list. Never summarize, skip or invent entries.";

const EXTRACTION_PROMPT: &str = "Transcribe this wine list. Respond with a single JSON object of the form:\n\
{\"restaurantName\": string or null, \"sections\": [{\"sectionName\": string, \"wines\": [{\"producer\": string, \
\"name\": string, \"vintage\": string or null, \"region\": string or null, \"bin\": string or null, \
\"glassPrice\": string or null, \"bottlePrice\": string or null}]}], \"totalWineCount\": number}";

/// Read every wine from a hosted wine list photo
pub async fn extract_menu(vision: &dyn VisionModel, image_url: &str) -> Result<MenuExtraction> {
    let request = VisionRequest::new(EXTRACTION_PROMPT, image_url)
        .system(EXTRACTION_SYSTEM_PROMPT)
        .detail(ImageDetail::High)
        .max_tokens(4096)
        .temperature(0.1)
        .json_output(true);

    let reply = vision
        .complete(request)
        .await
        .map_err(|e| Error::extraction(e.to_string()))?;

    let extraction = parse_extraction(&reply)?;
    log::info!(
        "Extracted {} wines in {} sections",
        extraction.total_wine_count,
        extraction.sections.len()
    );
    Ok(extraction)
}

/// Parse the model's JSON reply, tolerating markdown code fences
pub fn parse_extraction(reply: &str) -> Result<MenuExtraction> {
    let json = strip_code_fence(reply);
    let mut extraction: MenuExtraction = serde_json::from_str(json)
        .map_err(|e| Error::extraction(format!("reply is not valid extraction JSON: {}", e)))?;

    extraction.sections.retain(|s| !s.wines.is_empty());
    let counted = extraction.wine_count();
    if counted == 0 {
        return Err(Error::extraction("no wines found in reply"));
    }
    if extraction.total_wine_count != counted {
        log::debug!(
            "Reported wine count {} differs from listed {}, using listed",
            extraction.total_wine_count,
            counted
        );
        extraction.total_wine_count = counted;
    }
    Ok(extraction)
}

/// Strip a surrounding ```json ... ``` fence if present
pub(crate) fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    match inner.split_once('\n') {
        Some((lang, body)) if !lang.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}
