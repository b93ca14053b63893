//! Server-rendered HTML for the single-page UI.

use stockai_core::pipeline::AnalysisReport;
use stockai_core::present::{chart_points, fmt_money, fmt_opt, Banner, DISCLAIMER};

const CHART_WIDTH: f64 = 720.0;
const CHART_HEIGHT: f64 = 240.0;

const STYLE: &str = r#"
body { font-family: Helvetica, Arial, sans-serif; max-width: 960px; margin: 0 auto; padding: 24px; background: #fff5f5; }
h1 { text-align: center; color: #d33; }
.subtitle { text-align: center; color: #e66; margin-bottom: 24px; }
form { display: flex; gap: 8px; justify-content: center; }
input[type=text] { font-size: 1.1rem; padding: 8px; width: 220px; text-transform: uppercase; }
button { background: #d33; color: #fff; font-weight: bold; border: 0; border-radius: 8px; padding: 8px 18px; }
#spinner { display: none; text-align: center; margin: 16px; }
.grid { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }
.card { background: #fff; border-radius: 12px; padding: 16px; box-shadow: 2px 2px 12px rgba(0,0,0,.15); margin-bottom: 16px; }
table { width: 100%; border-collapse: collapse; }
td { padding: 4px 8px; border-bottom: 1px solid #eee; }
td.v { text-align: right; font-family: monospace; }
.recommendation { font-size: 1.6rem; font-weight: bold; padding: 14px; border-radius: 12px; text-align: center; color: #fff; }
.buy { background: #28a745; }
.hold { background: #ffc107; color: #000; }
.sell { background: #dc3545; }
.error { background: #fde2e2; border: 1px solid #dc3545; border-radius: 8px; padding: 12px; }
.warn { color: #8a6d00; }
pre { white-space: pre-wrap; word-break: break-word; }
footer { margin-top: 32px; text-align: center; color: #888; font-size: .9rem; }
"#;

pub fn render_index() -> String {
    layout("", "")
}

pub fn render_error(symbol: &str, title: &str, detail: &str) -> String {
    let body = format!(
        r#"<div class="error"><strong>{}</strong><pre>{}</pre></div>"#,
        escape(title),
        escape(detail)
    );
    layout(symbol, &body)
}

pub fn render_report(report: &AnalysisReport) -> String {
    let t = &report.technical;
    let f = &report.fundamental;

    let technical_rows = [
        ("Last price", fmt_opt(Some(t.last_price))),
        ("SMA 50", fmt_opt(t.sma50)),
        ("SMA 200", fmt_opt(t.sma200)),
        ("RSI 14", fmt_opt(t.rsi)),
        ("MACD", fmt_opt(t.macd)),
        ("MACD signal", fmt_opt(t.macd_signal)),
    ];
    let fundamental_rows = [
        ("Market cap", fmt_money(f.market_cap)),
        ("Trailing P/E", fmt_opt(f.trailing_pe)),
        ("Forward P/E", fmt_opt(f.forward_pe)),
        ("Price / book", fmt_opt(f.price_to_book)),
        ("Dividend yield", fmt_opt(f.dividend_yield)),
    ];

    let mut body = String::new();
    body.push_str(&format!(
        "<h2>{} &middot; as of {}</h2>",
        escape(&report.symbol),
        t.as_of
    ));

    for warning in report.warnings() {
        body.push_str(&format!(r#"<p class="warn">{}</p>"#, escape(&warning)));
    }

    body.push_str(r#"<div class="grid">"#);
    body.push_str(&card("Technical indicators", &table(&technical_rows)));
    body.push_str(&card("Fundamentals", &table(&fundamental_rows)));
    body.push_str("</div>");

    body.push_str(&card(
        "Price chart (1y, daily close)",
        &format!(
            r##"<svg viewBox="0 0 {w} {h}" width="100%" height="{h}" preserveAspectRatio="none"><polyline fill="none" stroke="#d33" stroke-width="2" points="{pts}"/></svg>"##,
            w = CHART_WIDTH,
            h = CHART_HEIGHT,
            pts = chart_points(&report.series, CHART_WIDTH, CHART_HEIGHT)
        ),
    ));

    match &report.recommendation {
        Ok(res) => {
            let banner = Banner::for_result(res);
            body.push_str(&format!(
                r#"<div class="recommendation {}">{}</div>"#,
                banner.css_class,
                escape(&banner.headline)
            ));
            body.push_str(&card("Technical summary", &para(&res.technical_summary)));
            body.push_str(&card("Fundamental summary", &para(&res.fundamental_summary)));
            if !res.risks.is_empty() {
                let items: String = res
                    .risks
                    .iter()
                    .map(|r| format!("<li>{}</li>", escape(r)))
                    .collect();
                body.push_str(&card("Risks", &format!("<ul>{items}</ul>")));
            }
            if let Some(notes) = &res.notes {
                body.push_str(&card("Notes", &para(notes)));
            }
        }
        Err(err) => {
            let mut detail = err.to_string();
            if let Some(raw) = &err.raw_output {
                detail.push_str("\n\nRaw model output:\n");
                detail.push_str(raw);
            }
            body.push_str(&format!(
                r#"<div class="error"><strong>Recommendation unavailable</strong><pre>{}</pre></div>"#,
                escape(&detail)
            ));
        }
    }

    layout(&report.symbol, &body)
}

fn layout(symbol: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AI Stock Analyzer</title>
<style>{STYLE}</style>
</head>
<body>
<h1>AI Stock Analyzer</h1>
<div class="subtitle">Analyze stocks with technical, fundamental &amp; AI insights</div>
<form action="/analyze" method="get" onsubmit="showSpinner()">
  <input type="text" id="symbol" name="symbol" placeholder="e.g., AAPL" value="{symbol}" autofocus>
  <button type="submit">Analyze</button>
</form>
<div id="spinner">Analyzing <span id="spinner-symbol"></span>&hellip;</div>
<div id="results">{body}</div>
<footer>{DISCLAIMER}</footer>
<script>
function showSpinner() {{
  var s = document.getElementById('symbol').value.trim().toUpperCase();
  document.getElementById('spinner-symbol').textContent = s;
  document.getElementById('spinner').style.display = 'block';
  document.getElementById('results').style.display = 'none';
}}
</script>
</body>
</html>
"#,
        symbol = escape(symbol.trim()),
    )
}

fn card(title: &str, inner: &str) -> String {
    format!(
        r#"<div class="card"><h3>{}</h3>{inner}</div>"#,
        escape(title)
    )
}

fn table(rows: &[(&str, String)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(k, v)| format!(r#"<tr><td>{}</td><td class="v">{}</td></tr>"#, escape(k), escape(v)))
        .collect();
    format!("<table>{rows}</table>")
}

fn para(text: &str) -> String {
    format!("<p>{}</p>", escape(text))
}

/// Model output is untrusted; everything interpolated into the page goes through here.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use stockai_core::domain::fundamental::FundamentalSnapshot;
    use stockai_core::domain::market::{PriceBar, PriceSeries};
    use stockai_core::domain::recommendation::{Action, RecommendationResult};
    use stockai_core::domain::technical::TechnicalSnapshot;
    use stockai_core::llm::error::LlmDiagnosticsError;
    use stockai_core::llm::Provider;

    fn report(
        recommendation: Result<RecommendationResult, LlmDiagnosticsError>,
    ) -> AnalysisReport {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let series = PriceSeries::new(
            (0..5)
                .map(|i| PriceBar {
                    date: start + Duration::days(i),
                    close: 100.0 + i as f64,
                })
                .collect(),
        );
        AnalysisReport {
            symbol: "AAPL".to_string(),
            as_of: Utc.with_ymd_and_hms(2026, 1, 5, 21, 0, 0).unwrap(),
            series,
            technical: TechnicalSnapshot {
                as_of: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                last_price: 150.0,
                sma50: Some(145.0),
                sma200: Some(140.0),
                rsi: Some(62.0),
                macd: None,
                macd_signal: None,
            },
            fundamental: FundamentalSnapshot::default(),
            recommendation,
        }
    }

    #[test]
    fn renders_hold_banner_and_escapes_model_text() {
        let html = render_report(&report(Ok(RecommendationResult {
            action: Action::Hold,
            confidence: 55,
            technical_summary: "neutral <b>trend</b>".to_string(),
            fundamental_summary: "fair value".to_string(),
            risks: vec!["macro".to_string()],
            notes: None,
        })));

        assert!(html.contains(r#"<div class="recommendation hold">HOLD (Confidence: 55%)</div>"#));
        assert!(html.contains("neutral &lt;b&gt;trend&lt;/b&gt;"));
        assert!(html.contains("<li>macro</li>"));
        assert!(html.contains("<td>SMA 200</td><td class=\"v\">140.00</td>"));
        assert!(html.contains("<td>MACD</td><td class=\"v\">n/a</td>"));
        assert!(!html.contains("<h3>Notes</h3>"));
        assert!(html.contains("<polyline"));
    }

    #[test]
    fn renders_model_error_with_raw_text() {
        let err = LlmDiagnosticsError::new(Provider::OpenAI, "parse", "bad json")
            .with_raw_output("{oops}");
        let html = render_report(&report(Err(err)));

        assert!(html.contains("Recommendation unavailable"));
        assert!(html.contains("stage=parse"));
        assert!(html.contains("{oops}"));
        assert!(!html.contains("class=\"recommendation"));
    }

    #[test]
    fn index_has_form_and_spinner() {
        let html = render_index();
        assert!(html.contains(r#"<form action="/analyze""#));
        assert!(html.contains(">Analyze</button>"));
        assert!(html.contains("id=\"spinner\""));
        assert!(html.contains(DISCLAIMER));
    }

    #[test]
    fn error_page_escapes_symbol() {
        let html = render_error("<script>", "Analysis failed", "No historical data found for this symbol.");
        assert!(html.contains("value=\"&lt;script&gt;\""));
        assert!(html.contains("No historical data found"));
    }
}
