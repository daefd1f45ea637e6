use crate::error::{AppError, Result};
use crate::models::Interval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sample of a price series
///
/// Close-only upstreams leave open/high/low to be derived: open is the
/// previous sample's close, high and low equal the close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Timestamp of the sample
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,

    /// Opening price
    pub open: f64,

    /// Highest price
    pub high: f64,

    /// Lowest price
    pub low: f64,

    /// Closing price
    pub close: f64,
}

impl PricePoint {
    /// Create a sample with explicit OHLC values
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }
}

/// Ordered samples for one symbol, strictly increasing in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from samples that are already in order
    ///
    /// Fails with `InvalidInput` when timestamps are not strictly increasing.
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self> {
        let symbol = symbol.into();
        if let Some(pos) = points.windows(2).position(|w| w[1].time <= w[0].time) {
            return Err(AppError::InvalidInput(format!(
                "{}: timestamps not strictly increasing at index {}",
                symbol,
                pos + 1
            )));
        }
        Ok(Self { symbol, points })
    }

    /// Build a series from raw `(timestamp_ms, close)` pairs
    ///
    /// Samples are sorted, duplicate timestamps keep the later sample and
    /// non-finite prices are dropped. Open/high/low are forward-filled from
    /// the closes.
    pub fn from_close_samples(symbol: impl Into<String>, samples: &[(i64, f64)]) -> Result<Self> {
        let mut cleaned: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(samples.len());

        for &(ts_ms, close) in samples {
            if !close.is_finite() || close < 0.0 {
                continue;
            }
            let time = DateTime::from_timestamp_millis(ts_ms).ok_or_else(|| {
                AppError::MalformedResponse(format!("Invalid timestamp: {}", ts_ms))
            })?;
            cleaned.push((time, close));
        }

        // Stable sort keeps arrival order among equal timestamps so the later one wins
        cleaned.sort_by_key(|(time, _)| *time);
        let mut deduped: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(cleaned.len());
        for (time, close) in cleaned {
            match deduped.last_mut() {
                Some(last) if last.0 == time => last.1 = close,
                _ => deduped.push((time, close)),
            }
        }

        Ok(Self {
            symbol: symbol.into(),
            points: Self::derive_ohlc(&deduped),
        })
    }

    fn derive_ohlc(closes: &[(DateTime<Utc>, f64)]) -> Vec<PricePoint> {
        let mut prev_close: Option<f64> = None;
        closes
            .iter()
            .map(|&(time, close)| {
                let open = prev_close.unwrap_or(close);
                prev_close = Some(close);
                PricePoint::new(time, open, close, close, close)
            })
            .collect()
    }

    /// Downsample to `interval`, keeping the last close of each bucket
    ///
    /// Each bucket is stamped with the time of its last sample, so no value
    /// is moved earlier than when it was observed.
    pub fn resample(&self, interval: Interval) -> PriceSeries {
        let bucket_ms = interval.seconds() * 1000;
        let mut buckets: Vec<(i64, DateTime<Utc>, f64)> = Vec::new();

        for point in &self.points {
            let bucket = point.time.timestamp_millis().div_euclid(bucket_ms);
            match buckets.last_mut() {
                Some(last) if last.0 == bucket => {
                    last.1 = point.time;
                    last.2 = point.close;
                }
                _ => buckets.push((bucket, point.time, point.close)),
            }
        }

        let closes: Vec<(DateTime<Utc>, f64)> =
            buckets.into_iter().map(|(_, time, close)| (time, close)).collect();

        PriceSeries {
            symbol: self.symbol.clone(),
            points: Self::derive_ohlc(&closes),
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Closing prices, oldest first
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
