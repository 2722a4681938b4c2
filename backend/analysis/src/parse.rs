//! Pull the JSON object out of a model reply.
//!
//! Models wrap their JSON in prose or markdown fences often enough that the
//! reply is never parsed as-is first. The heuristic: take the span from the
//! first `{` to the last `}` inside the first fenced block, then over the whole
//! reply; failing both, parse the whole reply. Nothing is repaired or
//! defaulted here.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::AnalysisError;

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)```").unwrap());

static OBJECT_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

/// Parse the `{...}` span of `text`. `None` when there is no span.
fn parse_span(text: &str) -> Option<Result<Value, serde_json::Error>> {
    OBJECT_SPAN
        .find(text)
        .map(|span| serde_json::from_str::<Value>(span.as_str()))
}

/// Parse the model's reply into JSON, or return it untouched inside the error.
pub fn extract_json(raw: &str) -> Result<Value, AnalysisError> {
    let fenced = FENCED_BLOCK
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());

    let mut span_error = None;
    for text in fenced.into_iter().chain(std::iter::once(raw)) {
        match parse_span(text) {
            Some(Ok(value)) => return Ok(value),
            Some(Err(e)) => span_error = span_error.or(Some(e.to_string())),
            None => {}
        }
    }

    serde_json::from_str::<Value>(raw.trim()).map_err(|e| AnalysisError::Unparsable {
        raw: raw.to_string(),
        reason: span_error.unwrap_or_else(|| e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_object_extracted_unchanged() {
        let raw = "Here is the analysis you asked for:\n\
                   {\"customerName\": \"R. Kumar\", \"percentageChance\": 78, \
                   \"points\": [{\"pointId\": \"P1\", \"depth\": \"220 ft\"}]}\n\
                   Let me know if you need anything else.";
        let value = extract_json(raw).unwrap();
        assert_eq!(
            value,
            json!({
                "customerName": "R. Kumar",
                "percentageChance": 78,
                "points": [{ "pointId": "P1", "depth": "220 ft" }]
            })
        );
    }

    #[test]
    fn test_fenced_block() {
        let raw = "```json\n{\"chanceLevel\": \"High\"}\n```";
        assert_eq!(extract_json(raw).unwrap(), json!({"chanceLevel": "High"}));
    }

    #[test]
    fn test_object_after_non_json_fence() {
        let raw = "Readings:\n```\nAB/2 = 60 m\n```\nResult:\n{\"percentageChance\": 70}";
        assert_eq!(extract_json(raw).unwrap(), json!({"percentageChance": 70}));
    }

    #[test]
    fn test_fenced_object_preferred_over_surrounding_braces() {
        let raw = "Station {4}\n```json\n{\"surveyId\": \"GW-7\"}\n```";
        assert_eq!(extract_json(raw).unwrap(), json!({"surveyId": "GW-7"}));
    }

    #[test]
    fn test_bare_object() {
        assert_eq!(extract_json(" {\"a\": 1} ").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_whole_reply_fallback_for_non_object_json() {
        assert_eq!(extract_json("[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_unparsable_keeps_raw_text() {
        let raw = "Sorry, I cannot read this survey. {not json}";
        match extract_json(raw).unwrap_err() {
            AnalysisError::Unparsable { raw: kept, reason } => {
                assert_eq!(kept, raw);
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_prose_only_is_unparsable() {
        assert!(matches!(
            extract_json("The water chance is high."),
            Err(AnalysisError::Unparsable { .. })
        ));
    }
}
