use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Indicators taken at the most recent bar of one `PriceSeries`.
///
/// A `None` field means the series was too short for that indicator. It is
/// serialized as `null` and must never be replaced by a default number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub as_of: NaiveDate,
    pub last_price: f64,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
}

impl TechnicalSnapshot {
    /// Names of indicators that could not be computed.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("sma50", self.sma50),
            ("sma200", self.sma200),
            ("rsi", self.rsi),
            ("macd", self.macd),
            ("macd_signal", self.macd_signal),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_lists_absent_indicators_in_order() {
        let snap = TechnicalSnapshot {
            as_of: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            last_price: 10.0,
            sma50: Some(9.0),
            sma200: None,
            rsi: Some(55.0),
            macd: Some(0.1),
            macd_signal: None,
        };

        assert_eq!(snap.missing(), vec!["sma200", "macd_signal"]);
    }

    #[test]
    fn missing_values_serialize_as_null() {
        let snap = TechnicalSnapshot {
            as_of: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            last_price: 10.0,
            sma50: None,
            sma200: None,
            rsi: None,
            macd: None,
            macd_signal: None,
        };

        let v = serde_json::to_value(&snap).unwrap();
        assert!(v["sma200"].is_null());
        assert_eq!(v["last_price"], 10.0);
        assert_eq!(v["as_of"], "2026-01-02");
    }
}
