//! Locating the recommendation object inside model text.
//!
//! Accepted shapes, in order: a fenced ```json block, or exactly one top-level
//! `{...}` object anywhere in the text. Object boundaries come from a
//! string-aware brace scan. Anything else (no object, several objects, an
//! unterminated object) is rejected rather than guessed at.

use crate::domain::contract::LlmRecommendation;
use crate::domain::recommendation::RecommendationResult;
use anyhow::{bail, Context};

#[derive(Debug)]
pub enum ParseStage {
    Extract,
    Parse,
    Validate,
}

impl ParseStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStage::Extract => "extract",
            ParseStage::Parse => "parse",
            ParseStage::Validate => "validate",
        }
    }
}

pub fn extract_json(text: &str) -> anyhow::Result<&str> {
    if let Some(fenced) = fenced_block(text) {
        let objects = top_level_objects(fenced)?;
        return match objects.as_slice() {
            [only] if fenced.trim() == *only => Ok(*only),
            _ => bail!("fenced block must contain exactly one JSON object and nothing else"),
        };
    }

    let objects = top_level_objects(text)?;
    match objects.as_slice() {
        [] => bail!("model output contains no JSON object"),
        [only] => Ok(*only),
        many => bail!("model output contains {} JSON objects; expected exactly one", many.len()),
    }
}

pub fn parse_recommendation(text: &str) -> Result<RecommendationResult, (ParseStage, anyhow::Error)> {
    let json_str = extract_json(text).map_err(|e| (ParseStage::Extract, e))?;
    parse_value(
        serde_json::from_str::<serde_json::Value>(json_str)
            .with_context(|| format!("model output is not valid JSON: {json_str}"))
            .map_err(|e| (ParseStage::Parse, e))?,
    )
}

/// Decodes an already-structured value (e.g. a tool call input).
pub fn parse_value(value: serde_json::Value) -> Result<RecommendationResult, (ParseStage, anyhow::Error)> {
    let parsed = serde_json::from_value::<LlmRecommendation>(value)
        .context("JSON does not match the recommendation schema")
        .map_err(|e| (ParseStage::Validate, e))?;
    parsed
        .validate_and_into_result()
        .map_err(|e| (ParseStage::Validate, e))
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip the info string (```json) up to the end of the line.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Slices of every balanced top-level `{...}` in `text`. Braces inside JSON
/// strings are ignored. A `{` that never closes is an error.
fn top_level_objects(text: &str) -> anyhow::Result<Vec<&str>> {
    let mut out = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        bail!("model output contains an unterminated JSON object");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::Action;

    const BODY: &str = r#"{"action":"BUY","confidence":80,"technical_summary":"uptrend","fundamental_summary":"cheap","risks":["rates"],"notes":"watch {earnings}"}"#;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = format!("Here is my view: {BODY} Thanks!");
        assert_eq!(extract_json(&text).unwrap(), BODY);

        let res = parse_recommendation(&text).unwrap();
        assert_eq!(res.action, Action::Buy);
        assert_eq!(res.confidence, 80);
        assert_eq!(res.notes.as_deref(), Some("watch {earnings}"));
    }

    #[test]
    fn extracts_fenced_block() {
        let text = format!("Sure.\n```json\n{BODY}\n```\nLet me know.");
        assert_eq!(extract_json(&text).unwrap(), BODY);
    }

    #[test]
    fn no_brace_is_an_extract_error() {
        let err = parse_recommendation("I cannot help with that.").unwrap_err();
        assert_eq!(err.0.as_str(), "extract");
    }

    #[test]
    fn multiple_objects_are_rejected() {
        let text = format!("{{\"draft\":true}} and then {BODY}");
        assert!(extract_json(&text).is_err());
    }

    #[test]
    fn unterminated_object_is_rejected() {
        assert!(extract_json("{\"action\":\"BUY\"").is_err());
    }

    #[test]
    fn stray_closing_brace_in_prose_is_ignored() {
        let text = format!("note :) }} {BODY}");
        assert_eq!(extract_json(&text).unwrap(), BODY);
    }

    #[test]
    fn fenced_block_with_trailing_text_is_rejected() {
        let text = format!("```json\n{BODY}\nalso this\n```");
        assert!(extract_json(&text).is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_recommendation("{\"action\": BUY}").unwrap_err();
        assert_eq!(err.0.as_str(), "parse");
    }

    #[test]
    fn schema_violation_is_a_validate_error() {
        let err = parse_recommendation(r#"{"action":"BUY"}"#).unwrap_err();
        assert_eq!(err.0.as_str(), "validate");
    }
}
