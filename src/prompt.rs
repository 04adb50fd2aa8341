//! Context prompts
//!
//! A chat photo never reaches the assistant on its own: the text part of the
//! message is replaced by a category-specific instruction block with the
//! user's own words appended. All functions here are pure.

use crate::types::{ImageCategory, MenuExtraction, WineEntry};

const FORMAT_RULES: &str = "Keep the reply concise and practical. Use short paragraphs or bullet points, \
and avoid long preambles.";

const WINE_MENU_INSTRUCTIONS: &str = "The user has shared a photo of a wine list. Extract every wine you can read \
on the list, then recommend two or three options that fit the user's request and explain why. \
Mention prices where they are visible.";

const MEAL_PHOTO_INSTRUCTIONS: &str = "The user has shared a photo of a meal. Describe the dish, estimate its \
calories and macronutrients (protein, carbs, fat), and explain how it fits a traveler's nutrition goals. \
If the user asks about drinks, suggest a pairing.";

const WINE_BOTTLE_INSTRUCTIONS: &str = "The user has shared a photo of a wine bottle or label. Identify the \
bottle: producer, wine name, vintage and region where visible. Describe its style and suggest dishes it \
would pair with.";

const OTHER_INSTRUCTIONS: &str = "The user has shared a photo that does not look like a meal, a wine list or \
a wine bottle. Briefly say what you can see, then ask the user to clarify what they would like help with. \
Do not attempt a detailed analysis.";

const EXTRACTED_MENU_INSTRUCTIONS: &str = "The user has shared a photo of a wine list. The complete list, read \
from the photo, is below. Base every recommendation on these wines only, recommend two or three that fit \
the user's request and explain why.";

/// Build the text part for a message whose first photo was classified as `category`
pub fn build_prompt(category: ImageCategory, user_text: Option<&str>, persona: &str) -> String {
    let instructions = match category {
        ImageCategory::WineMenu => WINE_MENU_INSTRUCTIONS,
        ImageCategory::MealPhoto => MEAL_PHOTO_INSTRUCTIONS,
        ImageCategory::WineBottle => WINE_BOTTLE_INSTRUCTIONS,
        ImageCategory::Other => OTHER_INSTRUCTIONS,
    };
    assemble(persona, instructions, user_text)
}

/// Wine list prompt built from a successful extraction
pub fn build_menu_prompt(
    extraction: &MenuExtraction,
    user_text: Option<&str>,
    persona: &str,
) -> String {
    let instructions = format!("{}\n\n{}", EXTRACTED_MENU_INSTRUCTIONS, render_menu(extraction));
    assemble(persona, &instructions, user_text)
}

fn assemble(persona: &str, instructions: &str, user_text: Option<&str>) -> String {
    let mut prompt = String::new();
    let persona = persona.trim();
    if !persona.is_empty() {
        prompt.push_str(persona);
        prompt.push_str("\n\n");
    }
    prompt.push_str(FORMAT_RULES);
    prompt.push_str("\n\n");
    prompt.push_str(instructions);

    if let Some(text) = user_text.map(str::trim).filter(|t| !t.is_empty()) {
        prompt.push_str("\n\nUser's message: ");
        prompt.push_str(text);
    }
    prompt
}

/// Plain-text listing of an extracted wine list, grouped by section
pub fn render_menu(extraction: &MenuExtraction) -> String {
    let mut lines = Vec::new();

    if let Some(name) = extraction
        .restaurant_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        lines.push(format!("Restaurant: {}", name));
    }

    for section in &extraction.sections {
        if section.wines.is_empty() {
            continue;
        }
        let heading = section.section_name.trim();
        lines.push(format!(
            "## {}",
            if heading.is_empty() { "Wines" } else { heading }
        ));
        lines.extend(section.wines.iter().map(|wine| format!("- {}", render_wine(wine))));
    }

    let total = if extraction.total_wine_count > 0 {
        extraction.total_wine_count
    } else {
        extraction.wine_count()
    };
    lines.push(format!("Total wines listed: {}", total));

    lines.join("\n")
}

fn render_wine(wine: &WineEntry) -> String {
    let mut fields: Vec<String> = Vec::new();

    let label = [wine.producer.trim(), wine.name.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !label.is_empty() {
        fields.push(label);
    }

    let optional = [
        (wine.vintage.as_deref(), ""),
        (wine.region.as_deref(), ""),
        (wine.bin.as_deref(), "bin "),
        (wine.glass_price.as_deref(), "glass "),
        (wine.bottle_price.as_deref(), "bottle "),
    ];
    for (value, prefix) in optional {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            fields.push(format!("{}{}", prefix, value));
        }
    }

    fields.join(" | ")
}

/// Text note for images that could not be uploaded
pub fn upload_advisory(failed: usize, total: usize) -> String {
    if total == 1 {
        "Note: the attached image could not be processed.".to_string()
    } else {
        format!("Note: {} of {} images could not be processed.", failed, total)
    }
}
