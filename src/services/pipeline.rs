use crate::config::AppConfig;
use crate::error::Result;
use crate::models::{Interval, Signal, SymbolOutcome};
use crate::services::feeds::{NewsFeed, SocialFeed};
use crate::services::price_source::PriceSource;
use crate::services::sentiment::SentimentAnalyzer;
use crate::services::signal_generator::SignalGenerator;
use crate::services::technical::TechnicalAnalyzer;
use crate::utils::pair_symbol;
use std::sync::Arc;
use tracing::{info, warn};

/// One analysis pass: price, history, technical score, sentiment, fused signal
pub struct SignalPipeline {
    prices: Arc<PriceSource>,
    news: Arc<dyn NewsFeed>,
    social: Arc<dyn SocialFeed>,
    technical: TechnicalAnalyzer,
    sentiment: SentimentAnalyzer,
    generator: SignalGenerator,
    history_interval: Interval,
    history_lookback_days: i64,
}

impl SignalPipeline {
    pub fn new(
        config: &AppConfig,
        prices: Arc<PriceSource>,
        news: Arc<dyn NewsFeed>,
        social: Arc<dyn SocialFeed>,
    ) -> Self {
        Self {
            prices,
            news,
            social,
            technical: TechnicalAnalyzer::new(config.technical.clone()),
            sentiment: SentimentAnalyzer::default(),
            generator: SignalGenerator::new(config.signal.clone()),
            history_interval: config.data.history_interval,
            history_lookback_days: config.data.history_lookback_days,
        }
    }

    /// Analyse one symbol; any failure becomes an explicit `Unavailable`
    pub async fn analyze_symbol(&self, symbol: &str) -> SymbolOutcome {
        let pair = pair_symbol(symbol);
        match self.try_analyze(&pair).await {
            Ok(signal) => SymbolOutcome::Available(signal),
            Err(e) => {
                warn!(symbol = %pair, error = %e, "Skipping symbol this cycle");
                SymbolOutcome::Unavailable {
                    symbol: pair,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_analyze(&self, pair: &str) -> Result<Signal> {
        let current_price = self.prices.get_current_price(pair).await?;
        let series = self
            .prices
            .get_historical_series(pair, self.history_interval, self.history_lookback_days)
            .await?;
        let technical = self.technical.get_buy_recommendation(&series)?;

        let articles = self.news.recent_articles(pair).await;
        let posts = self.social.recent_posts(pair).await;
        let sentiment = self.sentiment.combine(&articles, &posts);

        Ok(self.generator.generate(pair, technical, sentiment, current_price))
    }

    /// Analyse every symbol in turn
    pub async fn run_analysis(&self, symbols: &[String]) -> Vec<SymbolOutcome> {
        let mut outcomes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            outcomes.push(self.analyze_symbol(symbol).await);
        }

        let available = outcomes.iter().filter(|o| o.signal().is_some()).count();
        info!(
            total = outcomes.len(),
            available,
            unavailable = outcomes.len() - available,
            "Analysis pass complete"
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::error::AppError;
    use crate::models::Recommendation;
    use crate::services::feeds::testing::StaticFeed;
    use crate::services::feeds::NewsArticle;
    use crate::services::market_api::testing::FakeMarketApi;

    const HOUR_MS: i64 = 3_600_000;

    fn hourly(closes: impl Iterator<Item = f64>) -> Vec<(i64, f64)> {
        closes.enumerate().map(|(i, c)| (i as i64 * HOUR_MS, c)).collect()
    }

    fn pipeline(fake: Arc<FakeMarketApi>, feed: StaticFeed) -> SignalPipeline {
        let config = AppConfig::default();
        let prices = Arc::new(PriceSource::new(fake, DataConfig::default()));
        let feed = Arc::new(feed);
        SignalPipeline::new(&config, prices, feed.clone(), feed)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rising_series_without_sentiment_is_hold() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 140.0);
        fake.set_history("bitcoin", hourly((0..40).map(|i| 100.0 + 40.0 * i as f64 / 39.0)));

        let outcome = pipeline(fake, StaticFeed::default()).analyze_symbol("BTC").await;
        let signal = outcome.signal().expect("signal");

        assert_eq!(signal.symbol, "BTCUSDT");
        assert_eq!(signal.current_price, 140.0);
        assert!((signal.technical.confidence - 0.5).abs() < 1e-12);
        assert_eq!(signal.sentiment.confidence, 0.5);
        assert!((signal.confidence - 0.5).abs() < 1e-12);
        assert_eq!(signal.recommendation, Recommendation::Hold);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversold_dip_with_good_news_is_buy() {
        // Long decline then a sharp drop below the lower band
        let fake = Arc::new(FakeMarketApi::new());
        let closes = (0..60).map(|i| if i < 59 { 200.0 - i as f64 } else { 120.0 });
        fake.set_price("ETHUSDT", 120.0);
        fake.set_history("ethereum", hourly(closes));

        let feed = StaticFeed {
            articles: vec![NewsArticle {
                title: "ETF approval sparks rally".to_string(),
                description: Some("Analysts bullish on strong inflows".to_string()),
                published_at: None,
            }],
            posts: vec!["great entry, bullish".to_string()],
        };
        let outcome = pipeline(fake, feed).analyze_symbol("ETH").await;
        let signal = outcome.signal().expect("signal");

        // RSI oversold and close under the lower band; MACD still below its signal
        assert!(signal.technical.indicators.rsi < 30.0);
        assert!(signal.technical.indicators.close < signal.technical.indicators.bb_lower);
        assert!(signal.sentiment.confidence > 0.8);
        assert!(signal.confidence >= 0.7);
        assert_eq!(signal.recommendation, Recommendation::Buy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_history_is_unavailable() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("HBARUSDT", 0.1);
        fake.set_history("hedera-hashgraph", hourly((0..12).map(|i| 0.1 + i as f64 * 0.001)));

        let outcome = pipeline(fake, StaticFeed::default()).analyze_symbol("HBAR").await;
        match outcome {
            SymbolOutcome::Unavailable { symbol, reason } => {
                assert_eq!(symbol, "HBARUSDT");
                assert_eq!(
                    reason,
                    AppError::InsufficientHistory { required: 36, available: 12 }.to_string()
                );
            }
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_analysis_skips_failures() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 140.0);
        fake.set_history("bitcoin", hourly((0..40).map(|i| 100.0 + i as f64)));
        // No price for DOGE

        let symbols = vec!["BTC".to_string(), "DOGE".to_string()];
        let outcomes = pipeline(fake, StaticFeed::default()).run_analysis(&symbols).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].signal().is_some());
        assert_eq!(outcomes[1].symbol(), "DOGEUSDT");
        assert!(outcomes[1].signal().is_none());
    }
}
