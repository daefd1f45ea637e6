use crate::constants::msi;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market direction derived from the Market Sentiment Index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    /// `msi >= 65` is bullish, `msi <= 35` bearish, anything between neutral
    pub fn from_msi(value: u8) -> Self {
        if value >= msi::BULLISH_AT {
            Direction::Bullish
        } else if value <= msi::BEARISH_AT {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bullish => "bullish",
            Direction::Neutral => "neutral",
            Direction::Bearish => "bearish",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canned chart-pattern templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPattern {
    BullFlag,
    CupAndHandle,
    InvertedHeadAndShoulders,
    Triangle,
    DoubleBottom,
    DoubleTop,
    HeadAndShoulders,
}

/// Thresholds on the 24h metrics used for pattern sub-selection
const STRONG_PRICE_MOVE: f64 = 0.05;
const MODERATE_PRICE_MOVE: f64 = 0.02;
const STRONG_VOLUME_MOVE: f64 = 0.4;

impl ChartPattern {
    /// Pick the template for a direction from the 24h metrics
    ///
    /// Deterministic: equal inputs always give the same pattern.
    pub fn select(direction: Direction, price_change: f64, volume_change: f64) -> Self {
        match direction {
            Direction::Bullish => {
                if price_change > STRONG_PRICE_MOVE && volume_change > STRONG_VOLUME_MOVE {
                    ChartPattern::BullFlag
                } else if price_change > MODERATE_PRICE_MOVE {
                    ChartPattern::CupAndHandle
                } else {
                    ChartPattern::InvertedHeadAndShoulders
                }
            }
            Direction::Bearish => {
                if price_change < -STRONG_PRICE_MOVE && volume_change > STRONG_VOLUME_MOVE {
                    ChartPattern::HeadAndShoulders
                } else {
                    ChartPattern::DoubleTop
                }
            }
            Direction::Neutral => {
                if price_change < 0.0 && volume_change > 0.0 {
                    ChartPattern::DoubleBottom
                } else {
                    ChartPattern::Triangle
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChartPattern::BullFlag => "Bull flag",
            ChartPattern::CupAndHandle => "Cup and handle",
            ChartPattern::InvertedHeadAndShoulders => "Inverted head and shoulders",
            ChartPattern::Triangle => "Triangle",
            ChartPattern::DoubleBottom => "Double bottom",
            ChartPattern::DoubleTop => "Double top",
            ChartPattern::HeadAndShoulders => "Head and shoulders",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ChartPattern::BullFlag => "Bull flag forming with rising volume, often followed by a move up",
            ChartPattern::CupAndHandle => "Cup and handle forming, usually a sign the uptrend continues",
            ChartPattern::InvertedHeadAndShoulders => {
                "Inverted head and shoulders could signal a price increase within 48 hours"
            }
            ChartPattern::Triangle => "Triangle forming, could break up or down in the next 48 hours",
            ChartPattern::DoubleBottom => "Double bottom suggesting a possible reversal of the downtrend",
            ChartPattern::DoubleTop => "Double top showing, which usually means the price might drop soon",
            ChartPattern::HeadAndShoulders => "Head and shoulders indicating a possible trend reversal down",
        }
    }

    /// Direction the pattern itself points to
    pub fn bias(&self) -> Direction {
        match self {
            ChartPattern::BullFlag
            | ChartPattern::CupAndHandle
            | ChartPattern::InvertedHeadAndShoulders
            | ChartPattern::DoubleBottom => Direction::Bullish,
            ChartPattern::Triangle => Direction::Neutral,
            ChartPattern::DoubleTop | ChartPattern::HeadAndShoulders => Direction::Bearish,
        }
    }

    /// Typical historical success rate, in percent
    pub fn success_rate(&self) -> u8 {
        match self {
            ChartPattern::BullFlag => 56,
            ChartPattern::CupAndHandle => 54,
            ChartPattern::InvertedHeadAndShoulders => 55,
            ChartPattern::Triangle => 50,
            ChartPattern::DoubleBottom => 53,
            ChartPattern::DoubleTop => 52,
            ChartPattern::HeadAndShoulders => 53,
        }
    }

    /// Price-target multipliers; a triangle has an upside and a downside target
    pub fn target_multipliers(&self) -> &'static [f64] {
        match self {
            ChartPattern::BullFlag => &[1.04],
            ChartPattern::CupAndHandle => &[1.03],
            ChartPattern::InvertedHeadAndShoulders => &[1.05],
            ChartPattern::Triangle => &[1.02, 0.98],
            ChartPattern::DoubleBottom => &[1.03],
            ChartPattern::DoubleTop => &[0.95],
            ChartPattern::HeadAndShoulders => &[0.94],
        }
    }

    /// Price targets for a given current price
    pub fn targets(&self, price: f64) -> Vec<f64> {
        self.target_multipliers().iter().map(|m| price * m).collect()
    }
}

impl fmt::Display for ChartPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Live 24h inputs of the derived market state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    /// Current price in the quote currency
    pub price: f64,

    /// 24h price change as a fraction (0.05 = +5%)
    pub price_change_24h: f64,

    /// Volume-trend proxy in [-1, 1]
    pub volume_change: f64,
}

/// Where the metrics behind a state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSource {
    /// Live 24h statistics
    Live,
    /// Live price, jittered metrics because the 24h statistics failed
    Jitter,
    /// Neutral default because the price could not be fetched
    Fallback,
}

/// Derived market state for one symbol
///
/// Owned by the market-state manager and handed out as copies, so every
/// reader within one refresh window sees the same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub symbol: String,
    pub price: f64,
    pub direction: Direction,
    /// Market Sentiment Index in [5, 95]
    pub msi_value: u8,
    pub pattern: ChartPattern,
    pub price_change_24h: f64,
    pub volume_change: f64,
    pub source: StateSource,
    pub updated_at: DateTime<Utc>,
}

impl MarketState {
    /// Neutral default used when nothing could be fetched
    pub fn neutral(symbol: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price: 0.0,
            direction: Direction::Neutral,
            msi_value: msi::NEUTRAL,
            pattern: ChartPattern::Triangle,
            price_change_24h: 0.0,
            volume_change: 0.0,
            source: StateSource::Fallback,
            updated_at: now,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.source != StateSource::Live
    }

    /// Price targets of the current pattern
    pub fn pattern_targets(&self) -> Vec<f64> {
        self.pattern.targets(self.price)
    }
}
