use crate::domain::recommendation::{Action, RecommendationResult};
use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// The JSON object the model is instructed to emit. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmRecommendation {
    pub action: String,
    pub confidence: f64,
    pub technical_summary: String,
    pub fundamental_summary: String,
    pub risks: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LlmRecommendation {
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["action", "confidence", "technical_summary", "fundamental_summary", "risks", "notes"],
            "properties": {
                "action": {"type": "string", "enum": ["BUY", "HOLD", "SELL"]},
                "confidence": {"type": "integer", "minimum": 0, "maximum": 100},
                "technical_summary": {"type": "string"},
                "fundamental_summary": {"type": "string"},
                "risks": {"type": "array", "items": {"type": "string"}},
                "notes": {"type": ["string", "null"]}
            }
        })
    }

    pub fn validate_and_into_result(self) -> anyhow::Result<RecommendationResult> {
        let action: Action = self.action.parse()?;

        ensure!(
            self.confidence.fract() == 0.0 && (0.0..=100.0).contains(&self.confidence),
            "confidence must be an integer between 0 and 100 (got {})",
            self.confidence
        );

        let technical_summary = self.technical_summary.trim().to_string();
        ensure!(!technical_summary.is_empty(), "technical_summary must be non-empty");

        let fundamental_summary = self.fundamental_summary.trim().to_string();
        ensure!(!fundamental_summary.is_empty(), "fundamental_summary must be non-empty");

        let risks = self
            .risks
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let notes = self
            .notes
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(RecommendationResult {
            action,
            confidence: self.confidence as u8,
            technical_summary,
            fundamental_summary,
            risks,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(v: serde_json::Value) -> anyhow::Result<RecommendationResult> {
        serde_json::from_value::<LlmRecommendation>(v)?.validate_and_into_result()
    }

    #[test]
    fn accepts_valid_result_and_normalizes_text() {
        let res = decode(json!({
            "action": "hold",
            "confidence": 55,
            "technical_summary": " neutral ",
            "fundamental_summary": "fair value",
            "risks": ["macro", "  "],
            "notes": "",
        }))
        .unwrap();

        assert_eq!(res.action, Action::Hold);
        assert_eq!(res.confidence, 55);
        assert_eq!(res.technical_summary, "neutral");
        assert_eq!(res.risks, vec!["macro".to_string()]);
        assert_eq!(res.notes, None);
    }

    #[test]
    fn notes_key_is_optional() {
        let res = decode(json!({
            "action": "SELL",
            "confidence": 70,
            "technical_summary": "downtrend",
            "fundamental_summary": "rich",
            "risks": [],
        }))
        .unwrap();
        assert_eq!(res.action, Action::Sell);
        assert!(res.notes.is_none());
    }

    #[test]
    fn rejects_unknown_action() {
        assert!(decode(json!({
            "action": "STRONG BUY",
            "confidence": 90,
            "technical_summary": "x",
            "fundamental_summary": "y",
            "risks": [],
        }))
        .is_err());
    }

    #[test]
    fn rejects_out_of_range_or_fractional_confidence() {
        for confidence in [json!(101), json!(-1), json!(55.5)] {
            let res = decode(json!({
                "action": "BUY",
                "confidence": confidence,
                "technical_summary": "x",
                "fundamental_summary": "y",
                "risks": [],
            }));
            assert!(res.is_err(), "confidence {confidence} should be rejected");
        }
    }

    #[test]
    fn rejects_unknown_and_missing_keys() {
        assert!(decode(json!({
            "action": "BUY",
            "confidence": 80,
            "technical_summary": "x",
            "fundamental_summary": "y",
            "risks": [],
            "price_target": 200,
        }))
        .is_err());

        assert!(decode(json!({
            "action": "BUY",
            "confidence": 80,
            "risks": [],
        }))
        .is_err());
    }

    #[test]
    fn schema_lists_every_field() {
        let schema = LlmRecommendation::json_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 6);
        assert_eq!(schema["properties"]["action"]["enum"], json!(["BUY", "HOLD", "SELL"]));
    }
}
