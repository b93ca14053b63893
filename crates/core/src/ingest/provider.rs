use crate::config::Settings;
use crate::domain::fundamental::{
    FundamentalFields, DIVIDEND_YIELD, FORWARD_PE, MARKET_CAP, PRICE_TO_BOOK, TRAILING_PE,
};
use crate::domain::market::{PriceBar, PriceSeries};
use crate::ingest::types::ChartEnvelope;
use anyhow::{Context, Result};
use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use yahoo_finance_api::{YQuoteSummary, YahooConnector};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const HISTORY_RANGE: &str = "1y";
const HISTORY_INTERVAL: &str = "1d";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Trailing year of adjusted daily closes. An unknown symbol is an empty
    /// series, not an error.
    async fn fetch_history(&self, symbol: &str) -> Result<PriceSeries>;

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalFields>;
}

/// Price history comes from the public chart endpoint. Fundamentals go through
/// `yahoo_finance_api`, which handles the cookie and crumb the quote summary
/// endpoint requires.
#[derive(Clone)]
pub struct YahooFinanceProvider {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    // get_ticker_info takes &mut self to refresh the crumb.
    connector: Arc<Mutex<YahooConnector>>,
}

impl YahooFinanceProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .market_data_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let timeout = Duration::from_secs(timeout_secs);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build market data http client")?;

        let connector = YahooConnector::new()
            .map_err(|e| anyhow::anyhow!("failed to build yahoo finance connector: {e}"))?;

        Ok(Self {
            http,
            base_url,
            timeout,
            connector: Arc::new(Mutex::new(connector)),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers
    }

    async fn get_text(&self, url: String, query: &[(&str, &str)]) -> Result<(StatusCode, String)> {
        let res = self
            .http
            .get(url)
            .headers(Self::headers())
            .query(query)
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        Ok((status, text))
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_history(&self, symbol: &str) -> Result<PriceSeries> {
        let url = self.url(&format!("/v8/finance/chart/{symbol}"));
        let (status, text) = self
            .get_text(
                url,
                &[
                    ("range", HISTORY_RANGE),
                    ("interval", HISTORY_INTERVAL),
                    ("events", "div,splits"),
                ],
            )
            .await?;

        parse_chart_response(status, &text)
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalFields> {
        let mut connector = self.connector.lock().await;
        let summary = tokio::time::timeout(self.timeout, connector.get_ticker_info(symbol))
            .await
            .with_context(|| format!("ticker info request timed out after {:?}", self.timeout))?
            .map_err(|e| anyhow::anyhow!("ticker info request failed ({symbol}): {e}"))?;

        Ok(parse_ticker_info(&summary))
    }
}

pub fn parse_chart_response(status: StatusCode, text: &str) -> Result<PriceSeries> {
    if status == StatusCode::NOT_FOUND {
        return Ok(PriceSeries::empty());
    }

    let envelope = match serde_json::from_str::<ChartEnvelope>(text) {
        Ok(env) => env,
        Err(err) if status.is_success() => {
            return Err(err).with_context(|| format!("chart response is not valid JSON: {text}"))
        }
        Err(_) => anyhow::bail!("chart endpoint HTTP {status}: {text}"),
    };

    if let Some(err) = &envelope.chart.error {
        // Yahoo reports unknown and delisted symbols as "Not Found".
        if err.code.as_deref() == Some("Not Found") {
            return Ok(PriceSeries::empty());
        }
        anyhow::bail!(
            "chart endpoint error (HTTP {status}): {} {}",
            err.code.as_deref().unwrap_or("unknown"),
            err.description.as_deref().unwrap_or("")
        );
    }
    anyhow::ensure!(status.is_success(), "chart endpoint HTTP {status}: {text}");

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::empty());
    };

    let timestamps = result.timestamp.unwrap_or_default();
    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    // Adjusted closes match the auto-adjusted history users expect.
    let closes: Vec<Option<f64>> = match result
        .indicators
        .adjclose
        .and_then(|cols| cols.into_iter().next())
        .map(|c| c.adjclose)
        .filter(|c| !c.is_empty())
    {
        Some(adj) => adj,
        None => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(closes) {
        let Some(close) = close else { continue };
        let date = DateTime::from_timestamp(ts + offset, 0)
            .with_context(|| format!("invalid bar timestamp: {ts}"))?
            .date_naive();
        bars.push(PriceBar { date, close });
    }

    Ok(PriceSeries::new(bars))
}

/// Maps the quote summary modules onto the extractor keys. A symbol without a
/// summary yields an empty map.
pub fn parse_ticker_info(summary: &YQuoteSummary) -> FundamentalFields {
    let mut fields = FundamentalFields::new();
    let Some(data) = summary
        .quote_summary
        .as_ref()
        .and_then(|qs| qs.result.as_ref())
        .and_then(|r| r.first())
    else {
        return fields;
    };

    let detail = data.summary_detail.as_ref();
    let stats = data.default_key_statistics.as_ref();

    let market_cap = detail.and_then(|sd| sd.market_cap).map(|v| v as f64);
    let trailing_pe = detail.and_then(|sd| sd.trailing_pe);
    let forward_pe = stats
        .and_then(|ks| ks.forward_pe)
        .or_else(|| detail.and_then(|sd| sd.forward_pe));
    let price_to_book = stats.and_then(|ks| ks.price_to_book);
    let dividend_yield = detail.and_then(|sd| sd.trailing_annual_dividend_yield);

    for (key, value) in [
        (MARKET_CAP, market_cap),
        (TRAILING_PE, trailing_pe),
        (FORWARD_PE, forward_pe),
        (PRICE_TO_BOOK, price_to_book),
        (DIVIDEND_YIELD, dividend_yield),
    ] {
        if let Some(v) = value {
            fields.insert(key.to_string(), Value::from(v));
        }
    }
    fields
}
