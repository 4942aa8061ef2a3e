//! Normalization of provider replies into a [`ComparisonResult`].
//!
//! Generators are untrusted: replies may be wrapped in prose or markdown
//! fences, may follow an older schema revision, or may not be JSON at all.
//! [`normalize`] is total. When the reply cannot be understood it returns a
//! degraded result whose summary carries the raw text, so the caller always
//! has something legible to show.
//!
//! Schema revisions are handled by two detector chains:
//!
//! - entry key detectors decide the display key of a per-item entry
//!   (an embedded `name` field, or the object key itself);
//! - list detectors turn `pros` / `cons` into a list (a JSON array, or a
//!   single string of `- ` bullets).
//!
//! Support a new shape by appending a detector to the relevant chain.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{ComparisonResult, ProsCons};

const FENCE: &str = "```";
const BULLET_MARKER: &str = "- ";
const SUMMARY_KEY: &str = "summary";
const PROSCONS_KEY: &str = "proscons";

/// Prefix of the summary returned when a reply cannot be parsed.
pub const FALLBACK_SUMMARY_PREFIX: &str = "Failed to parse AI response. Raw output:\n\n";

/// Decides the display key for one per-item entry, or declines.
type KeyDetector = fn(&str, &Map<String, Value>) -> Option<String>;

/// Converts a `pros` / `cons` value into a list, or declines.
type ListDetector = fn(&Value) -> Option<Vec<String>>;

const KEY_DETECTORS: &[KeyDetector] = &[embedded_name_key, object_key];

const LIST_DETECTORS: &[ListDetector] = &[string_array, dash_bullets];

/// Convert a raw provider reply into a comparison result. Never fails.
pub fn normalize(raw: &str) -> ComparisonResult {
    match try_normalize(raw) {
        Ok(result) => result,
        Err(reason) => {
            warn!(reason = %reason, reply_len = raw.len(), "Falling back to raw provider reply");
            fallback(raw)
        }
    }
}

/// The degraded result for an unparseable reply.
pub fn fallback(raw: &str) -> ComparisonResult {
    ComparisonResult {
        per_item: IndexMap::new(),
        summary: format!("{FALLBACK_SUMMARY_PREFIX}{raw}"),
    }
}

/// Keep only the interior of a fenced code block, if there is one.
///
/// An optional language tag after the opening fence (` ```json `) is
/// dropped. Without a closing fence the trimmed text is returned unchanged.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find(FENCE) {
        let after_open = &trimmed[start + FENCE.len()..];
        let body = after_open.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        if let Some(end) = body.find(FENCE) {
            return body[..end].trim();
        }
    }
    trimmed
}

fn try_normalize(raw: &str) -> Result<ComparisonResult, String> {
    let payload = strip_code_fence(raw);
    let doc: Value = serde_json::from_str(payload).map_err(|e| format!("invalid JSON: {e}"))?;

    let proscons = doc
        .get(PROSCONS_KEY)
        .and_then(Value::as_object)
        .ok_or_else(|| format!("missing '{PROSCONS_KEY}' object"))?;

    let summary = proscons
        .get(SUMMARY_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing '{SUMMARY_KEY}' string"))?
        .to_string();

    let mut per_item = IndexMap::new();
    for (key, value) in proscons {
        if key == SUMMARY_KEY {
            continue;
        }
        let Some(entry) = value.as_object() else {
            debug!(key = %key, "Skipping non-object proscons entry");
            continue;
        };
        let Some(display_key) = KEY_DETECTORS.iter().find_map(|detect| detect(key, entry)) else {
            debug!(key = %key, "No key detector matched proscons entry");
            continue;
        };
        let pros_cons = ProsCons {
            pros: extract_list(entry.get("pros")),
            cons: extract_list(entry.get("cons")),
        };
        // Later duplicates replace earlier ones.
        per_item.insert(display_key, pros_cons);
    }

    Ok(ComparisonResult { per_item, summary })
}

fn extract_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => LIST_DETECTORS
            .iter()
            .find_map(|detect| detect(value))
            .unwrap_or_else(|| {
                debug!(?value, "Unrecognized pros/cons shape, treating as empty");
                Vec::new()
            }),
    }
}

/// Legacy shape: generic index keys (`model1`) with the label in `name`.
fn embedded_name_key(_key: &str, entry: &Map<String, Value>) -> Option<String> {
    entry
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Current shape: the object key is the label.
fn object_key(key: &str, _entry: &Map<String, Value>) -> Option<String> {
    Some(key.to_string())
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
    )
}

/// Legacy shape: one string such as `"- long\n- forgiving"`.
fn dash_bullets(value: &Value) -> Option<Vec<String>> {
    let text = value.as_str()?;
    let parts: Vec<String> = if text.contains(BULLET_MARKER) {
        text.split(BULLET_MARKER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        text.lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };
    Some(parts)
}
