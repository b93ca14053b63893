//! Technical indicators over daily closes.
//!
//! Every function is pure. Series shorter than an indicator's lookback yield an
//! empty result (or `None`) instead of a placeholder number.

use crate::domain::market::PriceSeries;
use crate::domain::technical::TechnicalSnapshot;

pub const SMA_SHORT: usize = 50;
pub const SMA_LONG: usize = 200;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Rolling simple moving average. `out[i]` is the mean of `data[i..i + period]`.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }

    data.windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Exponential moving average seeded with the SMA of the first `period` values.
///
/// `out[0]` lines up with `data[period - 1]`.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed = data[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(data.len() - period + 1);
    out.push(seed);
    for &x in &data[period..] {
        let prev = out[out.len() - 1];
        out.push((x - prev) * k + prev);
    }
    out
}

/// Latest Wilder RSI.
///
/// Flat input (no gains and no losses) returns 50; no losses at all returns 100.
pub fn rsi(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
    let p = period as f64;

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / p;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / p;

    for &c in &changes[period..] {
        avg_gain = (avg_gain * (p - 1.0) + c.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-c).max(0.0)) / p;
    }

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    /// EMA(fast) - EMA(slow), starting at `data[slow - 1]`.
    pub macd_line: Vec<f64>,
    /// EMA(signal) of `macd_line`, starting at `macd_line[signal - 1]`.
    pub signal_line: Vec<f64>,
}

pub fn macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let empty = MacdSeries {
        macd_line: Vec::new(),
        signal_line: Vec::new(),
    };
    if fast == 0 || signal == 0 || slow <= fast {
        return empty;
    }

    let ema_fast = ema(data, fast);
    let ema_slow = ema(data, slow);
    if ema_slow.is_empty() {
        return empty;
    }

    // ema_fast[0] is at data[fast - 1], ema_slow[0] at data[slow - 1].
    let offset = slow - fast;
    let macd_line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, slow_val)| ema_fast[i + offset] - slow_val)
        .collect();
    let signal_line = ema(&macd_line, signal);

    MacdSeries {
        macd_line,
        signal_line,
    }
}

/// Computes the full snapshot at the last bar. Returns `None` only for an empty series.
pub fn compute_technicals(series: &PriceSeries) -> Option<TechnicalSnapshot> {
    let last = series.last()?;
    let closes = series.closes();
    let m = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

    Some(TechnicalSnapshot {
        as_of: last.date,
        last_price: last.close,
        sma50: sma(&closes, SMA_SHORT).last().copied(),
        sma200: sma(&closes, SMA_LONG).last().copied(),
        rsi: rsi(&closes, RSI_PERIOD),
        macd: m.macd_line.last().copied(),
        macd_signal: m.signal_line.last().copied(),
    })
}
