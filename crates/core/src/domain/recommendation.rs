use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::fundamental::FundamentalSnapshot;
use crate::domain::technical::TechnicalSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Hold => "HOLD",
            Action::Sell => "SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "HOLD" => Ok(Action::Hold),
            "SELL" => Ok(Action::Sell),
            other => anyhow::bail!("action must be one of BUY, HOLD, SELL (got {other:?})"),
        }
    }
}

/// Exactly what is serialized into the model prompt.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationRequest {
    pub symbol: String,
    pub as_of: DateTime<Utc>,
    pub technical: TechnicalSnapshot,
    pub fundamental: FundamentalSnapshot,
}

impl RecommendationRequest {
    pub fn payload_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{{\"symbol\":\"{}\"}}", self.symbol))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub action: Action,
    pub confidence: u8,
    pub technical_summary: String,
    pub fundamental_summary: String,
    pub risks: Vec<String>,
    pub notes: Option<String>,
}
