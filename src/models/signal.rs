use crate::models::IndicatorSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fused recommendation; there is no SELL outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Hold,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of the technical analyzer for one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalRecommendation {
    /// `(signal + 1) / 2`: a linear remap of the score, not a probability
    pub confidence: f64,

    /// Rule-based score in [-1, 1]
    pub signal: f64,

    /// Indicator values the score was computed from
    pub indicators: IndicatorSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentComponents {
    pub news: f64,
    pub social: f64,
}

/// Output of the sentiment analyzer for one symbol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecommendation {
    /// Combined score in [0, 1], 0.5 is neutral
    pub confidence: f64,
    pub components: SentimentComponents,
}

/// Result of one analysis pass for one symbol
///
/// Created fresh on every pass and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Weighted fusion of the technical and sentiment confidences
    pub confidence: f64,

    pub recommendation: Recommendation,

    /// Price in the quote currency at analysis time
    pub current_price: f64,

    pub technical: TechnicalRecommendation,

    pub sentiment: SentimentRecommendation,
}

/// Per-symbol outcome of an analysis pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Available(Signal),
    Unavailable { symbol: String, reason: String },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Available(signal) => &signal.symbol,
            SymbolOutcome::Unavailable { symbol, .. } => symbol,
        }
    }

    pub fn signal(&self) -> Option<&Signal> {
        match self {
            SymbolOutcome::Available(signal) => Some(signal),
            SymbolOutcome::Unavailable { .. } => None,
        }
    }
}
