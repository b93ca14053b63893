use std::fmt::Write;

use stockai_core::pipeline::AnalysisReport;
use stockai_core::present::{fmt_money, fmt_opt, sparkline, Banner, DISCLAIMER};

const SPARKLINE_WIDTH: usize = 60;

pub fn render_text(report: &AnalysisReport) -> String {
    let t = &report.technical;
    let f = &report.fundamental;
    let mut out = String::new();

    let _ = writeln!(out, "{} (as of {}, {} bars)", report.symbol, t.as_of, report.series.len());
    for warning in report.warnings() {
        let _ = writeln!(out, "warning: {warning}");
    }

    let _ = writeln!(out, "\nTechnical indicators");
    for (k, v) in [
        ("Last price", fmt_opt(Some(t.last_price))),
        ("SMA 50", fmt_opt(t.sma50)),
        ("SMA 200", fmt_opt(t.sma200)),
        ("RSI 14", fmt_opt(t.rsi)),
        ("MACD", fmt_opt(t.macd)),
        ("MACD signal", fmt_opt(t.macd_signal)),
    ] {
        let _ = writeln!(out, "  {k:<16}{v:>14}");
    }

    let _ = writeln!(out, "\nFundamentals");
    for (k, v) in [
        ("Market cap", fmt_money(f.market_cap)),
        ("Trailing P/E", fmt_opt(f.trailing_pe)),
        ("Forward P/E", fmt_opt(f.forward_pe)),
        ("Price / book", fmt_opt(f.price_to_book)),
        ("Dividend yield", fmt_opt(f.dividend_yield)),
    ] {
        let _ = writeln!(out, "  {k:<16}{v:>14}");
    }

    let _ = writeln!(out, "\nClose  {}", sparkline(&report.series, SPARKLINE_WIDTH));

    match &report.recommendation {
        Ok(res) => {
            let banner = Banner::for_result(res);
            let _ = writeln!(out, "\n== {} ==", banner.headline);
            let _ = writeln!(out, "\nTechnical summary\n  {}", res.technical_summary);
            let _ = writeln!(out, "\nFundamental summary\n  {}", res.fundamental_summary);
            if !res.risks.is_empty() {
                let _ = writeln!(out, "\nRisks");
                for risk in &res.risks {
                    let _ = writeln!(out, "  - {risk}");
                }
            }
            if let Some(notes) = &res.notes {
                let _ = writeln!(out, "\nNotes\n  {notes}");
            }
        }
        Err(err) => {
            let _ = writeln!(out, "\nRecommendation unavailable: {err}");
            if let Some(raw) = &err.raw_output {
                let _ = writeln!(out, "Raw model output:\n{raw}");
            }
        }
    }

    let _ = writeln!(out, "\n{DISCLAIMER}");
    out
}
