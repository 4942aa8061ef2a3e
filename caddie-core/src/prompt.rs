//! Prompt rendering for club comparisons.
//!
//! The template asks the generator for JSON keyed by the two item labels.
//! [`crate::normalize`] depends on that contract, so keep both in step.

use serde_json::Value;

use crate::catalog::display_category;
use crate::types::ComparisonRequest;

/// System instruction for providers that accept one, constraining the reply
/// to bare JSON.
pub const JSON_ONLY_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that responds only in valid JSON format. Do not add any conversational text or markdown formatting.";

/// Render the comparison prompt for `request`.
pub fn build_prompt(request: &ComparisonRequest) -> String {
    let category = display_category(&request.category);
    let label1 = request.item1.label();
    let label2 = request.item2.label();
    // Schema keys are JSON string literals, so quotes in a name stay valid.
    let key1 = Value::String(label1.clone()).to_string();
    let key2 = Value::String(label2.clone()).to_string();
    let notes = match request.extra_notes.trim() {
        "" => "none",
        notes => notes,
    };

    format!(
        r#"Compare the {category} "{label1}" to "{label2}" for a player with a {handicap} handicap. High focus on reviews but also use product description. Also consider the following: {notes}.
Respond with JSON only. Use the full model names exactly as written above as keys and include a "summary" key. Keep the text short and concise. If one or both of the clubs do not suit the handicap, say so in the summary field and propose other {category} options from the same brand and model range.
The JSON must have this structure:
{{
  "proscons": {{
    {key1}: {{
      "pros": ["...", "..."],
      "cons": ["...", "..."]
    }},
    {key2}: {{
      "pros": ["...", "..."],
      "cons": ["...", "..."]
    }},
    "summary": "A recommendation summary..."
  }}
}}"#,
        handicap = request.player_skill_level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemDescriptor, ProviderId};

    fn request() -> ComparisonRequest {
        ComparisonRequest {
            item1: ItemDescriptor::new("Ping", "G430", 2023),
            item2: ItemDescriptor::new("Callaway", "Paradym", 2023).with_sub_category("X"),
            player_skill_level: 18,
            category: "FAIRWAY_WOOD".into(),
            extra_notes: "I slice the ball".into(),
            provider: ProviderId::Gemini,
        }
    }

    #[test]
    fn test_prompt_embeds_request_fields() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("Compare the Fairway Wood \"Ping G430 (2023)\""));
        assert!(prompt.contains("\"Callaway Paradym (2023) [X]\""));
        assert!(prompt.contains("a 18 handicap"));
        assert!(prompt.contains("consider the following: I slice the ball."));
    }

    #[test]
    fn test_prompt_asserts_label_keyed_schema() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("\"proscons\": {"));
        assert!(prompt.contains("    \"Ping G430 (2023)\": {"));
        assert!(prompt.contains("    \"Callaway Paradym (2023) [X]\": {"));
        assert!(prompt.contains("\"summary\": \"A recommendation summary...\""));
        assert!(prompt.contains("Respond with JSON only"));
        assert!(prompt.contains("same brand and model range"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt(&request()), build_prompt(&request()));
    }

    #[test]
    fn test_blank_notes_render_as_none() {
        let mut req = request();
        req.extra_notes = "   ".into();
        assert!(build_prompt(&req).contains("consider the following: none."));
    }

    #[test]
    fn test_schema_example_is_valid_json() {
        let prompt = build_prompt(&request());
        let start = prompt.find('{').unwrap();
        let schema: serde_json::Value = serde_json::from_str(&prompt[start..]).unwrap();
        assert!(schema["proscons"]["Ping G430 (2023)"]["pros"].is_array());
    }

    #[test]
    fn test_schema_stays_valid_with_quoted_names() {
        let mut req = request();
        req.item1 = ItemDescriptor::new("Odyssey", "Ai-ONE \"Jailbird\"", 2024);
        let prompt = build_prompt(&req);
        let start = prompt.find("{\n").unwrap();
        let schema: serde_json::Value = serde_json::from_str(&prompt[start..]).unwrap();
        assert!(schema["proscons"]["Odyssey Ai-ONE \"Jailbird\" (2024)"]["cons"].is_array());
    }
}
