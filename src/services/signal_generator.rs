use crate::config::SignalConfig;
use crate::models::{Recommendation, SentimentRecommendation, Signal, TechnicalRecommendation};
use chrono::{DateTime, Utc};
use tracing::info;

/// Fuses technical and sentiment confidence into a BUY/HOLD signal
#[derive(Debug, Clone, Default)]
pub struct SignalGenerator {
    config: SignalConfig,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Build a signal stamped with the current time
    pub fn generate(
        &self,
        symbol: &str,
        technical: TechnicalRecommendation,
        sentiment: SentimentRecommendation,
        current_price: f64,
    ) -> Signal {
        self.generate_at(symbol, technical, sentiment, current_price, Utc::now())
    }

    /// `confidence = w_t * technical + w_s * sentiment`; BUY iff `confidence >= threshold`
    pub fn generate_at(
        &self,
        symbol: &str,
        technical: TechnicalRecommendation,
        sentiment: SentimentRecommendation,
        current_price: f64,
        timestamp: DateTime<Utc>,
    ) -> Signal {
        let confidence = (self.config.technical_weight * technical.confidence
            + self.config.sentiment_weight * sentiment.confidence)
            .clamp(0.0, 1.0);

        let recommendation = if confidence >= self.config.threshold {
            Recommendation::Buy
        } else {
            Recommendation::Hold
        };

        info!(
            symbol = %symbol,
            confidence,
            technical = technical.confidence,
            sentiment = sentiment.confidence,
            recommendation = %recommendation,
            "Generated signal"
        );

        Signal {
            symbol: symbol.to_string(),
            timestamp,
            confidence,
            recommendation,
            current_price,
            technical,
            sentiment,
        }
    }
}
