//! Meal photo analysis
//!
//! Backs `POST /api/meal-analysis`. The photo goes straight to the vision
//! model as a data URL; nothing is hosted.

use crate::image_host::ImagePayload;
use crate::menu::strip_code_fence;
use crate::types::{ImageDetail, MealAnalysis};
use crate::vision::{VisionModel, VisionRequest};
use crate::{Error, Result};

const MEAL_SYSTEM_PROMPT: &str = "You are a sports nutritionist estimating the nutritional content of meals \
from photos for travelers who track their macros. Give realistic estimates for the visible portion sizes.";

const MEAL_PROMPT: &str = "Analyze this meal. Respond with a single JSON object of the form:\n\
{\"estimate\": {\"calories\": number, \"protein\": number, \"carbs\": number, \"fat\": number}, \
\"foodItems\": [string], \"analysis\": string, \"suggestions\": string}\n\
Protein, carbs and fat are in grams. \"analysis\" is two or three sentences on the meal's balance; \
\"suggestions\" gives one or two practical improvements for someone eating on the road.";

/// Estimate calories and macros for a meal photo (data URL or bare base64)
pub async fn analyze_meal(vision: &dyn VisionModel, image_data: &str) -> Result<MealAnalysis> {
    let payload = ImagePayload::parse(image_data)?;

    let request = VisionRequest::new(MEAL_PROMPT, payload.to_data_url())
        .system(MEAL_SYSTEM_PROMPT)
        .detail(ImageDetail::High)
        .max_tokens(800)
        .temperature(0.3)
        .json_output(true);

    let reply = vision.complete(request).await?;
    let analysis = parse_meal_analysis(&reply)?;
    log::info!(
        "Meal analysis: {} kcal, {} items",
        analysis.estimate.calories,
        analysis.food_items.len()
    );
    Ok(analysis)
}

/// Parse the model's JSON reply
pub fn parse_meal_analysis(reply: &str) -> Result<MealAnalysis> {
    let analysis: MealAnalysis = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| Error::api(format!("Meal analysis reply was not valid JSON: {}", e)))?;

    let estimate = &analysis.estimate;
    if [estimate.calories, estimate.protein, estimate.carbs, estimate.fat]
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0)
    {
        return Err(Error::api("Meal analysis reply contained invalid macro values"));
    }
    Ok(analysis)
}
