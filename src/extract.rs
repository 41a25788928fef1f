//! Structured-value recovery from raw model output.
//!
//! The external service is asked for bare JSON but is not contractually
//! guaranteed to return it: responses arrive wrapped in code fences,
//! prefixed with commentary, or both. Extraction tries progressively
//! looser recoveries and fails only when no parsable span exists.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// First greedy `{...}` span: everything between the first `{` and the
/// last `}` in the text.
static OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("object span regex"));

/// First greedy `[...]` span.
static ARRAY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("array span regex"));

/// How much of an unparsable response to carry in the error.
const SAMPLE_LEN: usize = 200;

/// Extraction failure carrying a truncated sample of the raw text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("could not extract JSON from response: {sample}")]
    Unparsable { sample: String },
}

/// Recover a structured value (object or array) from raw response text.
///
/// Attempts, first match wins:
/// 1. strip a surrounding code fence and parse the remainder
/// 2. parse the trimmed text directly
/// 3. parse the first greedy `{...}` span
/// 4. parse the first greedy `[...]` span
pub fn extract(raw: &str) -> Result<Value, ExtractError> {
    let text = raw.trim();

    let candidate = strip_fence(text);
    if let Ok(value) = serde_json::from_str(candidate) {
        return Ok(value);
    }

    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    if let Some(m) = OBJECT_SPAN.find(text) {
        if let Ok(value) = serde_json::from_str(m.as_str()) {
            return Ok(value);
        }
    }

    if let Some(m) = ARRAY_SPAN.find(text) {
        if let Ok(value) = serde_json::from_str(m.as_str()) {
            return Ok(value);
        }
    }

    Err(ExtractError::Unparsable {
        sample: truncate_sample(text),
    })
}

/// Remove a surrounding ``` fence: drop the first line (```json or
/// bare ```) and the last fence line. Returns the input unchanged when
/// it is not fenced.
fn strip_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }

    let Some(body_start) = text.find('\n') else {
        return text;
    };
    let body = &text[body_start + 1..];

    // Closing fence is the last line that is exactly ```.
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

fn truncate_sample(text: &str) -> String {
    if text.len() <= SAMPLE_LEN {
        return text.to_string();
    }
    let mut end = SAMPLE_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fenced_json() {
        let value = extract("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_fenced_without_language_tag() {
        let value = extract("```\n{\"a\": 1, \"b\": [2, 3]}\n```").unwrap();
        assert_eq!(value["b"][1], 3);
    }

    #[test]
    fn test_extract_bare_json() {
        let value = extract("{\"a\":1}").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_with_leading_commentary() {
        let value = extract("Sure! {\"a\":1}").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_with_surrounding_prose() {
        let raw = "Here is the plan you asked for:\n{\"files\": []}\nLet me know if it helps.";
        let value = extract(raw).unwrap();
        assert!(value["files"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_extract_array() {
        let value = extract("The components are: [\"a\", \"b\"]").unwrap();
        assert_eq!(value[0], "a");
    }

    #[test]
    fn test_extract_prefers_object_over_array() {
        // Object span wins even when an array appears first in the text.
        let value = extract("[1,2] then {\"a\":1}").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_fails_on_plain_text() {
        let err = extract("not json at all").unwrap_err();
        let ExtractError::Unparsable { sample } = err;
        assert!(sample.contains("not json at all"));
    }

    #[test]
    fn test_extract_failure_sample_truncated() {
        let long = "x".repeat(500);
        let ExtractError::Unparsable { sample } = extract(&long).unwrap_err();
        assert!(sample.len() <= SAMPLE_LEN + 3);
        assert!(sample.ends_with("..."));
    }

    #[test]
    fn test_extract_does_not_return_partial_data() {
        // Truncated JSON has a `{` but no balanced close; must fail,
        // not silently return a fragment.
        assert!(extract("{\"a\": 1, \"b\":").is_err());
    }

    #[test]
    fn test_extract_nested_fences_in_prose() {
        let raw = "```json\n{\"steps\": [\"one\", \"two\"]}\n```\n";
        let value = extract(raw).unwrap();
        assert_eq!(value["steps"][0], "one");
    }
}
