//! Display helpers shared by the web page and the CLI.

use crate::domain::market::PriceSeries;
use crate::domain::recommendation::{Action, RecommendationResult};

pub const DISCLAIMER: &str = "For educational purposes only. Not financial advice.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub action: Action,
    /// `buy` / `hold` / `sell`; the page colors them green / yellow / red.
    pub css_class: &'static str,
    pub headline: String,
}

impl Banner {
    pub fn for_result(res: &RecommendationResult) -> Self {
        let css_class = match res.action {
            Action::Buy => "buy",
            Action::Hold => "hold",
            Action::Sell => "sell",
        };
        Self {
            action: res.action,
            css_class,
            headline: format!("{} (Confidence: {}%)", res.action, res.confidence),
        }
    }
}

pub fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}"),
        None => "n/a".to_string(),
    }
}

/// Market caps read better abbreviated: 2.41T, 815.30B, 12.00M.
pub fn fmt_money(v: Option<f64>) -> String {
    let Some(v) = v else {
        return "n/a".to_string();
    };
    let abs = v.abs();
    if abs >= 1e12 {
        format!("{:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else {
        format!("{v:.2}")
    }
}

/// SVG polyline `points` for the closing prices, scaled into `width` x `height`
/// with the y axis flipped so higher prices sit higher.
pub fn chart_points(series: &PriceSeries, width: f64, height: f64) -> String {
    let closes = series.closes();
    if closes.is_empty() {
        return String::new();
    }

    let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };
    let step = if closes.len() > 1 {
        width / (closes.len() - 1) as f64
    } else {
        0.0
    };

    closes
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let x = i as f64 * step;
            let y = height - (c - min) / span * height;
            format!("{x:.1},{y:.1}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One-line unicode sparkline of closing prices, bucketed to `width` columns.
pub fn sparkline(series: &PriceSeries, width: usize) -> String {
    const TICKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    let closes = series.closes();
    if closes.is_empty() || width == 0 {
        return String::new();
    }

    let chunk = closes.len().div_ceil(width);
    let buckets: Vec<f64> = closes
        .chunks(chunk)
        .map(|c| c.iter().sum::<f64>() / c.len() as f64)
        .collect();

    let min = buckets.iter().copied().fold(f64::INFINITY, f64::min);
    let max = buckets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    buckets
        .iter()
        .map(|v| {
            if span <= 0.0 {
                TICKS[3]
            } else {
                let idx = ((v - min) / span * (TICKS.len() - 1) as f64).round() as usize;
                TICKS[idx.min(TICKS.len() - 1)]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn result(action: Action, confidence: u8) -> RecommendationResult {
        RecommendationResult {
            action,
            confidence,
            technical_summary: "t".to_string(),
            fundamental_summary: "f".to_string(),
            risks: vec![],
            notes: None,
        }
    }

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PriceBar {
                    date: start + Duration::days(i as i64),
                    close,
                })
                .collect(),
        )
    }

    #[test]
    fn banner_class_follows_action() {
        assert_eq!(Banner::for_result(&result(Action::Buy, 80)).css_class, "buy");
        assert_eq!(Banner::for_result(&result(Action::Hold, 55)).css_class, "hold");
        let sell = Banner::for_result(&result(Action::Sell, 30));
        assert_eq!(sell.css_class, "sell");
        assert_eq!(sell.headline, "SELL (Confidence: 30%)");
    }

    #[test]
    fn formats_optional_numbers() {
        assert_eq!(fmt_opt(Some(62.0)), "62.00");
        assert_eq!(fmt_opt(None), "n/a");
        assert_eq!(fmt_money(Some(2.41e12)), "2.41T");
        assert_eq!(fmt_money(Some(8.153e11)), "815.30B");
        assert_eq!(fmt_money(Some(0.0)), "0.00");
        assert_eq!(fmt_money(None), "n/a");
    }

    #[test]
    fn chart_points_span_the_box() {
        let pts = chart_points(&series(&[10.0, 20.0, 15.0]), 100.0, 50.0);
        assert_eq!(pts, "0.0,50.0 50.0,0.0 100.0,25.0");
        assert_eq!(chart_points(&PriceSeries::empty(), 100.0, 50.0), "");
    }

    #[test]
    fn sparkline_buckets_to_width() {
        let closes: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let line = sparkline(&series(&closes), 10);
        assert_eq!(line.chars().count(), 10);
        assert!(line.starts_with('▁'));
        assert!(line.ends_with('█'));

        let flat = sparkline(&series(&[5.0; 20]), 5);
        assert!(flat.chars().all(|c| c == '▄'));
    }
}
