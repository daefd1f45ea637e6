//! Technical indicators over closing prices
//!
//! Every function returns one value per input sample; samples before the
//! indicator's warm-up window are `None`.
//!
//! # Conventions
//! - EMA: `alpha = 2 / (period + 1)`, seeded with the first observation and
//!   reported once `period` observations have been folded in.
//! - RSI: Wilder's smoothing seeded with the simple average of the first
//!   `period` changes, so the first value appears at index `period`.
//! - Bollinger Bands: simple moving average ± `k` population standard deviations.

use serde::{Deserialize, Serialize};

/// Calculate Simple Moving Average for a given period
///
/// # Arguments
/// * `closes` - Slice of closing prices
/// * `period` - Period for the moving average (e.g., 10, 20, 50)
///
/// # Returns
/// * Vector of MA values (`None` until `period` samples are available)
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut ma_values = vec![None; closes.len()];

    if period == 0 || closes.len() < period {
        return ma_values;
    }

    for i in (period - 1)..closes.len() {
        let start_idx = i + 1 - period;
        let sum: f64 = closes[start_idx..=i].iter().sum();
        ma_values[i] = Some(sum / period as f64);
    }

    ma_values
}

/// Calculate Exponential Moving Average
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    ema_of_defined(&wrapped, period)
}

/// EMA over a series whose leading values may be undefined
///
/// Leading `None`s are skipped; the warm-up count starts at the first defined value.
fn ema_of_defined(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut ema: Option<f64> = None;
    let mut observed = 0usize;

    for (i, value) in values.iter().enumerate() {
        let Some(v) = *value else {
            continue;
        };
        let next = match ema {
            None => v,
            Some(prev) => alpha * v + (1.0 - alpha) * prev,
        };
        ema = Some(next);
        observed += 1;
        if observed >= period {
            out[i] = Some(next);
        }
    }

    out
}

/// Calculate Relative Strength Index (0-100)
///
/// A window without losses reads 100; a window without any movement reads 50.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut rsi_values = vec![None; closes.len()];

    if period == 0 || closes.len() <= period {
        return rsi_values;
    }

    let p = period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= p;
    avg_loss /= p;
    rsi_values[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        rsi_values[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    rsi_values
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MacdSeries {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Calculate Moving Average Convergence Divergence
///
/// The line is defined once the slow EMA is; the signal line needs `signal`
/// further line values.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let signal_line = ema_of_defined(&line, signal);

    let histogram = line
        .iter()
        .zip(signal_line.iter())
        .map(|(l, s)| match (l, s) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        })
        .collect();

    MacdSeries {
        line,
        signal: signal_line,
        histogram,
    }
}

/// Upper, middle and lower Bollinger bands
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands
///
/// # Arguments
/// * `closes` - Slice of closing prices
/// * `period` - Rolling window length
/// * `std_mult` - Band width in population standard deviations
pub fn calculate_bollinger_bands(closes: &[f64], period: usize, std_mult: f64) -> BollingerBands {
    let middle = calculate_sma(closes, period);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    for (i, mid) in middle.iter().enumerate() {
        let Some(mid) = *mid else {
            continue;
        };
        let window = &closes[i + 1 - period..=i];
        let variance = window.iter().map(|c| (c - mid).powi(2)).sum::<f64>() / period as f64;
        let std_dev = variance.sqrt();
        upper[i] = Some(mid + std_mult * std_dev);
        lower[i] = Some(mid - std_mult * std_dev);
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// Position of `close` inside the band: 0 at the lower band, 1 at the upper
///
/// Returns 0.5 for a zero-width band.
pub fn calculate_bb_position(close: f64, lower: f64, upper: f64) -> f64 {
    let width = upper - lower;
    if width.abs() < f64::EPSILON {
        0.5
    } else {
        (close - lower) / width
    }
}

/// Full indicator series for one price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub closes: Vec<f64>,
    pub rsi: Vec<Option<f64>>,
    pub macd: MacdSeries,
    pub bollinger: BollingerBands,
}

impl IndicatorSet {
    /// Latest sample at which every indicator is defined
    pub fn latest(&self) -> Option<IndicatorSnapshot> {
        (0..self.closes.len()).rev().find_map(|i| self.snapshot_at(i))
    }

    /// Indicator values at sample `i`, if all of them are defined there
    pub fn snapshot_at(&self, i: usize) -> Option<IndicatorSnapshot> {
        let close = *self.closes.get(i)?;
        let rsi = (*self.rsi.get(i)?)?;
        let macd = (*self.macd.line.get(i)?)?;
        let macd_signal = (*self.macd.signal.get(i)?)?;
        let macd_histogram = (*self.macd.histogram.get(i)?)?;
        let bb_upper = (*self.bollinger.upper.get(i)?)?;
        let bb_middle = (*self.bollinger.middle.get(i)?)?;
        let bb_lower = (*self.bollinger.lower.get(i)?)?;

        Some(IndicatorSnapshot {
            close,
            rsi,
            macd,
            macd_signal,
            macd_histogram,
            bb_upper,
            bb_middle,
            bb_lower,
            bb_position: calculate_bb_position(close, bb_lower, bb_upper),
        })
    }
}

/// Indicator values at a single sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    /// 0 at the lower band, 1 at the upper band
    pub bb_position: f64,
}
