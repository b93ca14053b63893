//! One user-triggered analysis: fetch, compute, ask, report.
//!
//! Steps run strictly in sequence. Anything the presentation layer should show
//! comes back either as an `AnalysisError` (the run stopped before the model
//! call) or inside `AnalysisReport::recommendation`.

use crate::domain::fundamental::{FundamentalFields, FundamentalSnapshot};
use crate::domain::market::PriceSeries;
use crate::domain::recommendation::{RecommendationRequest, RecommendationResult};
use crate::domain::technical::TechnicalSnapshot;
use crate::indicators::compute_technicals;
use crate::ingest::provider::MarketDataProvider;
use crate::ingest::symbol::normalize_symbol;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::RecommendationRequester;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::Instrument;

pub const NO_DATA_MESSAGE: &str = "No historical data found for this symbol.";

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub as_of: DateTime<Utc>,
    pub series: PriceSeries,
    pub technical: TechnicalSnapshot,
    pub fundamental: FundamentalSnapshot,
    #[serde(serialize_with = "serialize_outcome")]
    pub recommendation: Result<RecommendationResult, LlmDiagnosticsError>,
}

impl AnalysisReport {
    /// Indicator names that could not be computed, for display as warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.technical
            .missing()
            .into_iter()
            .map(|name| format!("{name} unavailable: not enough price history ({} bars)", self.series.len()))
            .collect()
    }
}

#[derive(Debug)]
pub enum AnalysisError {
    InvalidSymbol { input: String, detail: String },
    NoData { symbol: String },
    MarketData { symbol: String, detail: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidSymbol { input, detail } => {
                write!(f, "Invalid ticker symbol {input:?}: {detail}")
            }
            AnalysisError::NoData { symbol } => write!(f, "{NO_DATA_MESSAGE} ({symbol})"),
            AnalysisError::MarketData { symbol, detail } => {
                write!(f, "Failed to fetch market data for {symbol}: {detail}")
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

pub struct Analyzer<'a> {
    market: &'a dyn MarketDataProvider,
    requester: &'a RecommendationRequester,
}

impl<'a> Analyzer<'a> {
    pub fn new(market: &'a dyn MarketDataProvider, requester: &'a RecommendationRequester) -> Self {
        Self { market, requester }
    }

    pub async fn analyze(&self, input: &str) -> Result<AnalysisReport, AnalysisError> {
        let symbol = normalize_symbol(input).map_err(|e| AnalysisError::InvalidSymbol {
            input: input.to_string(),
            detail: format!("{e:#}"),
        })?;

        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("analysis", %run_id, %symbol);
        self.run(symbol).instrument(span).await
    }

    async fn run(&self, symbol: String) -> Result<AnalysisReport, AnalysisError> {
        let provider = self.market.provider_name();

        let series = self
            .market
            .fetch_history(&symbol)
            .await
            .map_err(|e| AnalysisError::MarketData {
                symbol: symbol.clone(),
                detail: format!("{e:#}"),
            })?;

        let Some(technical) = compute_technicals(&series) else {
            tracing::warn!(provider, "no price history returned; skipping model call");
            return Err(AnalysisError::NoData { symbol });
        };
        tracing::info!(provider, bars = series.len(), "price history fetched");

        let missing = technical.missing();
        if !missing.is_empty() {
            tracing::warn!(?missing, bars = series.len(), "indicators unavailable for short history");
        }

        let fields = match self.market.fetch_fundamentals(&symbol).await {
            Ok(fields) => fields,
            Err(err) => {
                tracing::warn!(provider, error = %format!("{err:#}"), "fundamentals unavailable; continuing without them");
                FundamentalFields::new()
            }
        };
        let fundamental = FundamentalSnapshot::extract(&fields);
        tracing::debug!(present = fundamental.present_count(), "fundamentals extracted");

        let request = RecommendationRequest {
            symbol: symbol.clone(),
            as_of: Utc::now(),
            technical,
            fundamental,
        };

        let recommendation = self.requester.request(&request).await;
        match &recommendation {
            Ok(res) => tracing::info!(
                llm = %self.requester.provider(),
                action = %res.action,
                confidence = res.confidence,
                "recommendation received"
            ),
            Err(err) => tracing::error!(
                llm = %err.provider,
                stage = err.stage,
                error = %err,
                "recommendation failed"
            ),
        }

        let RecommendationRequest {
            symbol,
            as_of,
            technical,
            fundamental,
        } = request;

        Ok(AnalysisReport {
            symbol,
            as_of,
            series,
            technical,
            fundamental,
            recommendation,
        })
    }
}

fn serialize_outcome<S: serde::Serializer>(
    outcome: &Result<RecommendationResult, LlmDiagnosticsError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    #[serde(tag = "status", rename_all = "lowercase")]
    enum Outcome<'a> {
        Ok(&'a RecommendationResult),
        Error(&'a LlmDiagnosticsError),
    }

    match outcome {
        Ok(result) => Outcome::Ok(result).serialize(serializer),
        Err(error) => Outcome::Error(error).serialize(serializer),
    }
}
