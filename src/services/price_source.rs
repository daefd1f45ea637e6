//! Rate-limited, cached access to prices and history
//!
//! - Every call to the market API goes through one [`RateLimiter`].
//! - Current prices are cached per pair for `price_cache_ttl`; a hit skips
//!   both the network and the limiter.
//! - Misses are single-flight: concurrent callers for the same pair wait on
//!   that pair's slot and reuse the first caller's result.
//! - An HTTP 429 is retried exactly once after `rate_limit_backoff`.

use crate::config::DataConfig;
use crate::error::Result;
use crate::models::{Interval, PriceSeries};
use crate::services::market_api::{MarketDataProvider, Ticker24h};
use crate::services::rate_limiter::RateLimiter;
use crate::utils::{coin_id, pair_symbol};
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    price: f64,
    fetched_at: Instant,
}

type PriceSlot = Arc<Mutex<Option<CachedPrice>>>;

pub struct PriceSource {
    provider: Arc<dyn MarketDataProvider>,
    limiter: RateLimiter,
    prices: Mutex<HashMap<String, PriceSlot>>,
    config: DataConfig,
}

impl PriceSource {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: DataConfig) -> Self {
        Self {
            provider,
            limiter: RateLimiter::new(config.min_request_interval()),
            prices: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    async fn slot(&self, pair: &str) -> PriceSlot {
        let mut prices = self.prices.lock().await;
        prices.entry(pair.to_string()).or_default().clone()
    }

    /// Rate-limited call with a single retry on 429
    async fn request<T, F, Fut>(&self, what: &str, pair: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.limiter.acquire().await;
        match call().await {
            Err(e) if e.is_rate_limited() => {
                let backoff = self.config.rate_limit_backoff();
                warn!(
                    symbol = %pair,
                    request = what,
                    backoff_secs = backoff.as_secs(),
                    "Rate limited, retrying once after backoff"
                );
                sleep(backoff).await;
                self.limiter.acquire().await;
                call().await
            }
            other => other,
        }
    }

    /// Latest price in the quote currency
    ///
    /// # Arguments
    /// * `symbol` - Bare ticker (`BTC`) or pair (`BTCUSDT`)
    ///
    /// # Returns
    /// * Cached price while it is younger than the TTL, otherwise a fresh one
    pub async fn get_current_price(&self, symbol: &str) -> Result<f64> {
        let pair = pair_symbol(symbol);
        let slot = self.slot(&pair).await;
        let mut cached = slot.lock().await;

        if let Some(entry) = *cached {
            if entry.fetched_at.elapsed() < self.config.price_cache_ttl() {
                debug!(symbol = %pair, price = entry.price, "Price cache hit");
                return Ok(entry.price);
            }
        }

        let price = self
            .request("price", &pair, || self.provider.fetch_price(&pair))
            .await
            .map_err(|e| {
                warn!(symbol = %pair, error = %e, "Failed to fetch current price");
                e
            })?;

        *cached = Some(CachedPrice {
            price,
            fetched_at: Instant::now(),
        });
        Ok(price)
    }

    /// Historical closes resampled to `interval`, oldest first
    pub async fn get_historical_series(
        &self,
        symbol: &str,
        interval: Interval,
        lookback_days: i64,
    ) -> Result<PriceSeries> {
        let pair = pair_symbol(symbol);
        let id = coin_id(&pair);
        let to = Utc::now();
        let from = to - ChronoDuration::days(lookback_days);

        let samples = self
            .request("history", &pair, || self.provider.fetch_price_history(&id, from, to))
            .await
            .map_err(|e| {
                warn!(symbol = %pair, coin_id = %id, error = %e, "Failed to fetch price history");
                e
            })?;

        let raw_len = samples.len();
        let series = PriceSeries::from_close_samples(pair.clone(), &samples)?.resample(interval);
        info!(
            symbol = %pair,
            interval = %interval,
            raw_samples = raw_len,
            samples = series.len(),
            "Fetched price history"
        );
        Ok(series)
    }

    /// 24h rolling statistics
    pub async fn get_24h_stats(&self, symbol: &str) -> Result<Ticker24h> {
        let pair = pair_symbol(symbol);
        self.request("24h", &pair, || self.provider.fetch_24h_ticker(&pair)).await
    }

    /// Convert `amount` from one currency to another; never fails
    ///
    /// Falls back to the configured rate for the quote → display pair, and to
    /// an unchanged amount for any other pair, when the live lookup fails.
    pub async fn convert_currency(&self, amount: f64, from: &str, to: &str) -> f64 {
        if from.eq_ignore_ascii_case(to) {
            return amount;
        }

        match self.provider.fetch_fx_rate(from, to).await {
            Ok(rate) if rate.is_finite() && rate > 0.0 => amount * rate,
            Ok(rate) => {
                warn!(from = %from, to = %to, rate, "Ignoring invalid FX rate");
                amount * self.fallback_rate(from, to)
            }
            Err(e) => {
                warn!(from = %from, to = %to, error = %e, "FX lookup failed, using fallback rate");
                amount * self.fallback_rate(from, to)
            }
        }
    }

    /// Convert a quote-currency amount to the display currency
    pub async fn to_display_currency(&self, amount: f64) -> f64 {
        let (from, to) = (self.config.quote_currency.clone(), self.config.display_currency.clone());
        self.convert_currency(amount, &from, &to).await
    }

    fn fallback_rate(&self, from: &str, to: &str) -> f64 {
        if from.eq_ignore_ascii_case(&self.config.quote_currency)
            && to.eq_ignore_ascii_case(&self.config.display_currency)
        {
            self.config.fallback_fx_rate
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::market_api::testing::FakeMarketApi;
    use std::time::Duration;

    const HOUR_MS: i64 = 3_600_000;

    fn source(fake: Arc<FakeMarketApi>) -> PriceSource {
        PriceSource::new(fake, DataConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_network_and_limiter() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        let src = source(fake.clone());

        assert_eq!(src.get_current_price("BTC").await.unwrap(), 43000.0);
        fake.set_price("BTCUSDT", 44000.0);

        let start = Instant::now();
        assert_eq!(src.get_current_price("BTCUSDT").await.unwrap(), 43000.0);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(FakeMarketApi::calls(&fake.price_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expires_after_ttl() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("ETHUSDT", 2200.0);
        let src = source(fake.clone());

        src.get_current_price("ETH").await.unwrap();
        fake.set_price("ETHUSDT", 2300.0);
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(src.get_current_price("ETH").await.unwrap(), 2300.0);
        assert_eq!(FakeMarketApi::calls(&fake.price_calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_are_single_flight() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("SOLUSDT", 95.0);
        let src = Arc::new(source(fake.clone()));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let src = src.clone();
                tokio::spawn(async move { src.get_current_price("SOL").await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 95.0);
        }
        assert_eq!(FakeMarketApi::calls(&fake.price_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_symbols_share_the_limiter() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        fake.set_price("ETHUSDT", 2200.0);
        let src = source(fake);

        let start = Instant::now();
        src.get_current_price("BTC").await.unwrap();
        src.get_current_price("ETH").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_retried_exactly_once() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        fake.fail_next_price(AppError::RateLimited);
        let src = source(fake.clone());

        let start = Instant::now();
        assert_eq!(src.get_current_price("BTC").await.unwrap(), 43000.0);
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(FakeMarketApi::calls(&fake.price_calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_429_surfaces() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        fake.fail_next_price(AppError::RateLimited);
        fake.fail_next_price(AppError::RateLimited);
        let src = source(fake.clone());

        let err = src.get_current_price("BTC").await.unwrap_err();
        assert_eq!(err, AppError::RateLimited);
        assert_eq!(FakeMarketApi::calls(&fake.price_calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_not_retried() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.fail_next_price(AppError::MalformedResponse("bad".to_string()));
        let src = source(fake.clone());

        assert!(matches!(
            src.get_current_price("BTC").await,
            Err(AppError::MalformedResponse(_))
        ));
        assert_eq!(FakeMarketApi::calls(&fake.price_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_resampled_and_retried() {
        let fake = Arc::new(FakeMarketApi::new());
        // 15-minute samples over 10 hours
        let samples: Vec<(i64, f64)> = (0..40).map(|i| (i * HOUR_MS / 4, 100.0 + i as f64)).collect();
        fake.set_history("bitcoin", samples);
        fake.fail_next_history(AppError::RateLimited);
        let src = source(fake.clone());

        let series = src
            .get_historical_series("BTC", Interval::Hour1, 30)
            .await
            .unwrap();
        assert_eq!(series.symbol, "BTCUSDT");
        assert_eq!(series.len(), 10);
        assert_eq!(series.closes()[0], 103.0);
        assert_eq!(FakeMarketApi::calls(&fake.history_calls), 2);
    }

    #[tokio::test]
    async fn test_convert_currency_never_fails() {
        let fake = Arc::new(FakeMarketApi::new());
        let src = source(fake.clone());

        fake.set_fx_rate(None);
        assert!((src.convert_currency(100.0, "USD", "GBP").await - 78.0).abs() < 1e-9);

        fake.set_fx_rate(Some(0.8));
        assert!((src.convert_currency(100.0, "USD", "GBP").await - 80.0).abs() < 1e-9);

        fake.set_fx_rate(Some(f64::NAN));
        assert!((src.to_display_currency(100.0).await - 78.0).abs() < 1e-9);

        assert_eq!(src.convert_currency(100.0, "USD", "usd").await, 100.0);
    }
}
