//! Image classification
//!
//! The first photo of a chat message picks the prompt template. The model
//! is asked for a single category word; anything else, including a failed
//! request, reads as [`ImageCategory::Other`].

use crate::Result;
use crate::image_host::display_url;
use crate::types::{ImageCategory, ImageDetail};
use crate::vision::{VisionModel, VisionRequest};

const CLASSIFY_PROMPT: &str = "Classify this image into exactly one of these categories:\n\
- wine_menu: a restaurant wine list, wine menu or drinks menu listing wines\n\
- meal_photo: a plate of food, a meal, a snack or a dish\n\
- wine_bottle: a wine bottle or wine label\n\
- other: anything else\n\n\
Respond with only the category name, nothing else.";

/// Classify a hosted image. Never fails: errors and unexpected replies yield `Other`.
pub async fn classify(vision: &dyn VisionModel, image_url: &str) -> ImageCategory {
    match try_classify(vision, image_url).await {
        Ok(category) => {
            log::info!("Classified {} as {}", display_url(image_url), category);
            category
        }
        Err(e) => {
            log::warn!("Image classification failed, defaulting to other: {}", e);
            ImageCategory::Other
        }
    }
}

async fn try_classify(vision: &dyn VisionModel, image_url: &str) -> Result<ImageCategory> {
    let request = VisionRequest::new(CLASSIFY_PROMPT, image_url)
        .detail(ImageDetail::Low)
        .max_tokens(10)
        .temperature(0.1);

    let reply = vision.complete(request).await?;
    parse_category(&reply).ok_or_else(|| {
        crate::Error::classification(format!("unrecognized category reply: {:?}", reply))
    })
}

/// Map a raw model reply onto a category
pub fn parse_category(reply: &str) -> Option<ImageCategory> {
    let normalized: String = reply
        .trim()
        .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();

    ImageCategory::ALL
        .into_iter()
        .find(|category| category.as_str() == normalized)
}
