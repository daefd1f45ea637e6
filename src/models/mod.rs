mod interval;
mod market_state;
mod price_series;
mod signal;
pub mod indicators;

pub use indicators::{IndicatorSet, IndicatorSnapshot};
pub use interval::Interval;
pub use market_state::{ChartPattern, Direction, MarketMetrics, MarketState, StateSource};
pub use price_series::{PricePoint, PriceSeries};
pub use signal::{
    Recommendation, SentimentComponents, SentimentRecommendation, Signal, SymbolOutcome,
    TechnicalRecommendation,
};
