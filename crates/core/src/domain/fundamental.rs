use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Loosely-typed provider fields keyed by the snake_case names below.
pub type FundamentalFields = BTreeMap<String, Value>;

pub const MARKET_CAP: &str = "market_cap";
pub const TRAILING_PE: &str = "trailing_pe";
pub const FORWARD_PE: &str = "forward_pe";
pub const PRICE_TO_BOOK: &str = "price_to_book";
pub const DIVIDEND_YIELD: &str = "dividend_yield";

/// Each field is independent; `None` means unknown, not zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub dividend_yield: Option<f64>,
}

impl FundamentalSnapshot {
    /// Never fails. Zero and negative readings pass through unchanged.
    pub fn extract(fields: &FundamentalFields) -> Self {
        let get = |key: &str| fields.get(key).and_then(as_number);
        Self {
            market_cap: get(MARKET_CAP),
            trailing_pe: get(TRAILING_PE),
            forward_pe: get(FORWARD_PE),
            price_to_book: get(PRICE_TO_BOOK),
            dividend_yield: get(DIVIDEND_YIELD),
        }
    }

    pub fn present_count(&self) -> usize {
        [
            self.market_cap,
            self.trailing_pe,
            self.forward_pe,
            self.price_to_book,
            self.dividend_yield,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }
}

fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}
