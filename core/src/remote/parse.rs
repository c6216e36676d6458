//! Shape validation for JSON embedded in model text output.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GenerationError;

fn fence_re() -> &'static Regex {
    static FENCE_REGEX: OnceLock<Regex> = OnceLock::new();
    FENCE_REGEX
        .get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("FENCE_REGEX is valid"))
}

/// Body of the first fenced code block, or the trimmed text when there is none.
pub fn unwrap_fenced(text: &str) -> &str {
    fence_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
        .trim()
}

pub fn parse_json(text: &str) -> Result<Value, GenerationError> {
    let body = unwrap_fenced(text);
    serde_json::from_str(body)
        .map_err(|e| GenerationError::Parse(format!("response is not valid JSON: {e}")))
}

/// A JSON array whose entries are all strings.
pub fn parse_string_list(text: &str) -> Result<Vec<String>, GenerationError> {
    match parse_json(text)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(GenerationError::Parse(format!(
                    "expected a string entry, got {}",
                    json_type(&other)
                ))),
            })
            .collect(),
        other => Err(GenerationError::Parse(format!(
            "expected an array, got {}",
            json_type(&other)
        ))),
    }
}

/// A JSON object mapping keys to string values, in the order the keys appear.
pub fn parse_string_map(text: &str) -> Result<Vec<(String, String)>, GenerationError> {
    match parse_json(text)? {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k, s)),
                other => Err(GenerationError::Parse(format!(
                    "expected a string value for '{k}', got {}",
                    json_type(&other)
                ))),
            })
            .collect(),
        other => Err(GenerationError::Parse(format!(
            "expected an object, got {}",
            json_type(&other)
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardContent {
    pub title: String,
    pub content: String,
    pub image_prompt: String,
}

#[derive(Deserialize)]
struct CardDeckEnvelope {
    cards: Vec<CardContent>,
}

/// An object with a `cards` array of `{title, content, image_prompt}`.
pub fn parse_card_deck(text: &str) -> Result<Vec<CardContent>, GenerationError> {
    let value = parse_json(text)?;
    if !value.is_object() {
        return Err(GenerationError::Parse(format!(
            "expected an object, got {}",
            json_type(&value)
        )));
    }
    if !value.get("cards").map(Value::is_array).unwrap_or(false) {
        return Err(GenerationError::Parse(
            "object has no 'cards' array".to_string(),
        ));
    }
    serde_json::from_value::<CardDeckEnvelope>(value)
        .map(|env| env.cards)
        .map_err(|e| GenerationError::Parse(format!("malformed card: {e}")))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_json_fence() {
        let text = "Here you go:\n```json\n[\"a\", \"b\"]\n```\nthanks";
        assert_eq!(unwrap_fenced(text), "[\"a\", \"b\"]");
        assert_eq!(unwrap_fenced("```\n{}\n```"), "{}");
        assert_eq!(unwrap_fenced("  [1] "), "[1]");
    }

    #[test]
    fn string_list_rejects_object() {
        let err = parse_string_list("{\"a\": 1}").unwrap_err();
        assert!(matches!(err, GenerationError::Parse(ref m) if m.contains("expected an array")));
    }

    #[test]
    fn string_list_rejects_non_string_entries() {
        assert!(parse_string_list("[\"a\", 2]").is_err());
        assert_eq!(
            parse_string_list("```json\n[\"a\", \"b\"]\n```").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = parse_json("not json at all").unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[test]
    fn string_map_rejects_array() {
        assert!(parse_string_map("[\"a\"]").is_err());
        let map = parse_string_map("{\"kw\": \"prompt\"}").unwrap();
        assert_eq!(map, vec![("kw".to_string(), "prompt".to_string())]);
    }

    #[test]
    fn card_deck_requires_cards() {
        assert!(parse_card_deck("{\"items\": []}").is_err());
        assert!(parse_card_deck("[]").is_err());
        let deck = parse_card_deck(
            "```json\n{\"cards\": [{\"title\": \"T\", \"content\": \"C\", \"image_prompt\": \"P\"}]}\n```",
        )
        .unwrap();
        assert_eq!(deck.len(), 1);
        assert_eq!(deck[0].image_prompt, "P");
    }
}
