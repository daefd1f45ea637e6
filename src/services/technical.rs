use crate::config::TechnicalConfig;
use crate::constants::score_weights;
use crate::error::{AppError, Result};
use crate::models::indicators::{calculate_bollinger_bands, calculate_macd, calculate_rsi};
use crate::models::{IndicatorSet, IndicatorSnapshot, PriceSeries, TechnicalRecommendation};
use tracing::debug;

/// RSI, MACD and Bollinger Bands plus the rule-based score built on them
#[derive(Debug, Clone, Default)]
pub struct TechnicalAnalyzer {
    config: TechnicalConfig,
}

impl TechnicalAnalyzer {
    pub fn new(config: TechnicalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TechnicalConfig {
        &self.config
    }

    /// Compute every indicator over the series
    ///
    /// Fails with `InsufficientHistory` when the series is shorter than the
    /// longest warm-up window, so the last sample always has every value.
    pub fn compute_indicators(&self, series: &PriceSeries) -> Result<IndicatorSet> {
        let required = self.config.min_samples();
        if series.len() < required {
            return Err(AppError::InsufficientHistory {
                required,
                available: series.len(),
            });
        }

        let closes = series.closes();
        let c = &self.config;
        Ok(IndicatorSet {
            rsi: calculate_rsi(&closes, c.rsi_period),
            macd: calculate_macd(&closes, c.macd_fast, c.macd_slow, c.macd_signal),
            bollinger: calculate_bollinger_bands(&closes, c.bollinger_period, c.bollinger_std),
            closes,
        })
    }

    /// Additive score in [-1, 1]
    ///
    /// | Condition             | Contribution |
    /// |-----------------------|--------------|
    /// | RSI < oversold        | +0.3         |
    /// | RSI > overbought      | −0.3         |
    /// | MACD > signal         | +0.3         |
    /// | MACD < signal         | −0.3         |
    /// | close < lower band    | +0.4         |
    /// | close > upper band    | −0.4         |
    pub fn score(&self, snapshot: &IndicatorSnapshot) -> f64 {
        let mut signal = 0.0;

        if snapshot.rsi < self.config.rsi_oversold {
            signal += score_weights::RSI;
        } else if snapshot.rsi > self.config.rsi_overbought {
            signal -= score_weights::RSI;
        }

        if snapshot.macd > snapshot.macd_signal {
            signal += score_weights::MACD;
        } else if snapshot.macd < snapshot.macd_signal {
            signal -= score_weights::MACD;
        }

        if snapshot.close < snapshot.bb_lower {
            signal += score_weights::BOLLINGER;
        } else if snapshot.close > snapshot.bb_upper {
            signal -= score_weights::BOLLINGER;
        }

        f64::clamp(signal, -1.0, 1.0)
    }

    /// Score the latest sample of a series
    ///
    /// `confidence = (signal + 1) / 2` is a linear remap of the score onto
    /// [0, 1], not a probability.
    pub fn get_buy_recommendation(&self, series: &PriceSeries) -> Result<TechnicalRecommendation> {
        let set = self.compute_indicators(series)?;
        let snapshot = set.latest().ok_or(AppError::InsufficientHistory {
            required: self.config.min_samples(),
            available: series.len(),
        })?;

        let signal = self.score(&snapshot);
        let confidence = signal_to_confidence(signal);
        debug!(
            symbol = %series.symbol,
            rsi = snapshot.rsi,
            macd = snapshot.macd,
            macd_signal = snapshot.macd_signal,
            bb_position = snapshot.bb_position,
            signal,
            "Technical score"
        );

        Ok(TechnicalRecommendation {
            confidence,
            signal,
            indicators: snapshot,
        })
    }
}

/// [-1, 1] → [0, 1]
pub fn signal_to_confidence(signal: f64) -> f64 {
    (signal + 1.0) / 2.0
}

/// [0, 1] → [-1, 1]
pub fn confidence_to_signal(confidence: f64) -> f64 {
    2.0 * confidence - 1.0
}
