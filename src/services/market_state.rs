//! Derived market state per symbol
//!
//! Each symbol's [`MarketState`] is derived from its live price and 24h
//! statistics, then cached for `refresh_interval`. Every reader inside one
//! window gets the same MSI, direction and pattern even if the price ticks
//! in between.
//!
//! # Staleness policies
//! - [`RefreshPolicy::PerSymbol`]: a symbol expires `refresh_interval` after its own refresh.
//! - [`RefreshPolicy::Batch`]: one shared timestamp; once it expires the next
//!   access recomputes the configured symbols plus those read during the
//!   last window.
//!
//! Symbols outside the configured list are forgotten once nobody has read
//! them for [`STATE_IDLE_INTERVALS`] refresh intervals.
//!
//! The manager never fails. A missing price gives the neutral default state,
//! missing 24h statistics give jittered metrics around zero.

use crate::config::{MarketStateConfig, RefreshPolicy};
use crate::constants::{
    msi, sentiment_coefficients as coef, JITTER_PRICE_CHANGE, JITTER_VOLUME_CHANGE, STATE_IDLE_INTERVALS,
};
use crate::error::Result;
use crate::models::{ChartPattern, Direction, MarketMetrics, MarketState, StateSource};
use crate::services::price_source::PriceSource;
use crate::services::session_hours::SessionHours;
use crate::utils::pair_symbol;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct Entry {
    state: MarketState,
    refreshed: Instant,
}

type StateSlot = Arc<Mutex<Option<Entry>>>;

struct Tracked {
    slot: StateSlot,
    last_read: Instant,
}

pub struct MarketStateManager {
    prices: Arc<PriceSource>,
    hours: SessionHours,
    config: MarketStateConfig,
    /// Pairs that are always refreshed and never evicted
    pinned: Vec<String>,
    slots: Mutex<HashMap<String, Tracked>>,
    last_batch: Mutex<Option<Instant>>,
    volumes: Mutex<HashMap<String, f64>>,
    rng: Mutex<StdRng>,
}

impl MarketStateManager {
    pub fn new(prices: Arc<PriceSource>, config: MarketStateConfig) -> Result<Self> {
        let hours = SessionHours::from_config(&config)?;
        let rng = match config.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            prices,
            hours,
            config,
            pinned: Vec::new(),
            slots: Mutex::new(HashMap::new()),
            last_batch: Mutex::new(None),
            volumes: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
        })
    }

    /// Keep `symbols` tracked regardless of reads
    pub fn with_symbols(mut self, symbols: &[String]) -> Self {
        self.pinned = symbols.iter().map(|s| pair_symbol(s)).collect();
        self
    }

    /// Current state for `symbol`, refreshing it first if stale
    pub async fn get_state(&self, symbol: &str) -> MarketState {
        let pair = pair_symbol(symbol);
        match self.config.refresh_policy {
            RefreshPolicy::PerSymbol => self.get_state_per_symbol(&pair).await,
            RefreshPolicy::Batch => self.get_state_batch(&pair).await,
        }
    }

    /// States for several symbols, in the order given
    pub async fn overview(&self, symbols: &[String]) -> Vec<MarketState> {
        let mut states = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            states.push(self.get_state(symbol).await);
        }
        states
    }

    /// Pairs with a cached state
    pub async fn tracked_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.slots.lock().await.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Slot for a reader; marks the pair as read
    async fn read_slot(&self, pair: &str) -> StateSlot {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        let tracked = slots.entry(pair.to_string()).or_insert_with(|| Tracked {
            slot: StateSlot::default(),
            last_read: now,
        });
        tracked.last_read = now;
        tracked.slot.clone()
    }

    /// Slot for the batch refresher; leaves the read time alone
    async fn refresh_slot(&self, pair: &str) -> StateSlot {
        let mut slots = self.slots.lock().await;
        slots
            .entry(pair.to_string())
            .or_insert_with(|| Tracked {
                slot: StateSlot::default(),
                last_read: Instant::now(),
            })
            .slot
            .clone()
    }

    fn idle_after(&self) -> Duration {
        self.config.refresh_interval() * STATE_IDLE_INTERVALS
    }

    /// Forget unpinned pairs nobody has read for a while
    async fn evict_idle(&self) {
        let horizon = self.idle_after();
        let evicted: Vec<String> = {
            let mut slots = self.slots.lock().await;
            let idle: Vec<String> = slots
                .iter()
                .filter(|(pair, tracked)| tracked.last_read.elapsed() >= horizon && !self.pinned.contains(*pair))
                .map(|(pair, _)| pair.clone())
                .collect();
            for pair in &idle {
                slots.remove(pair);
            }
            idle
        };

        if !evicted.is_empty() {
            let mut volumes = self.volumes.lock().await;
            for pair in &evicted {
                volumes.remove(pair);
            }
            debug!(count = evicted.len(), "Evicted idle market states");
        }
    }

    /// The requested pair, then pinned pairs, then pairs read in the last window
    async fn batch_members(&self, pair: &str) -> Vec<String> {
        let window = self.config.refresh_interval();
        let slots = self.slots.lock().await;
        let recent = slots
            .iter()
            .filter(|(_, tracked)| tracked.last_read.elapsed() < window)
            .map(|(p, _)| p);

        let mut members = vec![pair.to_string()];
        for candidate in self.pinned.iter().chain(recent) {
            if !members.contains(candidate) {
                members.push(candidate.clone());
            }
        }
        members
    }

    async fn get_state_per_symbol(&self, pair: &str) -> MarketState {
        let slot = self.read_slot(pair).await;
        let mut entry = slot.lock().await;

        if let Some(current) = entry.as_ref() {
            if current.refreshed.elapsed() < self.config.refresh_interval() {
                return current.state.clone();
            }
        }

        self.evict_idle().await;
        let state = self.compute_state(pair).await;
        *entry = Some(Entry {
            state: state.clone(),
            refreshed: Instant::now(),
        });
        state
    }

    async fn get_state_batch(&self, pair: &str) -> MarketState {
        let slot = self.read_slot(pair).await;

        let mut last_batch = self.last_batch.lock().await;
        let stale = last_batch.map_or(true, |t| t.elapsed() >= self.config.refresh_interval());
        if stale {
            self.evict_idle().await;
            let members = self.batch_members(pair).await;
            info!(count = members.len(), "Refreshing market states");

            // Claim every member before releasing the batch lock; readers then
            // wait only on the member they asked for
            let mut pending = Vec::with_capacity(members.len());
            for member in members {
                let guard = self.refresh_slot(&member).await.lock_owned().await;
                pending.push((member, guard));
            }
            *last_batch = Some(Instant::now());
            drop(last_batch);

            for (member, mut entry) in pending {
                let state = self.compute_state(&member).await;
                *entry = Some(Entry {
                    state,
                    refreshed: Instant::now(),
                });
            }
        } else {
            drop(last_batch);
        }

        let mut entry = slot.lock().await;
        if let Some(current) = entry.as_ref() {
            return current.state.clone();
        }
        // First read of a pair inside the current window
        let state = self.compute_state(pair).await;
        *entry = Some(Entry {
            state: state.clone(),
            refreshed: Instant::now(),
        });
        state
    }

    /// Fetch live inputs and derive a state; never fails
    async fn compute_state(&self, pair: &str) -> MarketState {
        let now = Utc::now();

        let price = match self.prices.get_current_price(pair).await {
            Ok(price) => price,
            Err(e) => {
                warn!(symbol = %pair, error = %e, "Price unavailable, using neutral market state");
                return MarketState::neutral(pair, now);
            }
        };

        let (metrics, source) = match self.prices.get_24h_stats(pair).await {
            Ok(ticker) => {
                let volume_change = self.volume_trend(pair, ticker.volume).await;
                (
                    MarketMetrics {
                        price,
                        price_change_24h: ticker.price_change_percent / 100.0,
                        volume_change,
                    },
                    StateSource::Live,
                )
            }
            Err(e) => {
                warn!(symbol = %pair, error = %e, "24h statistics unavailable, using jittered metrics");
                (self.jittered_metrics(price).await, StateSource::Jitter)
            }
        };

        let state = derive_state(pair, &metrics, &self.hours, now, source);
        debug!(
            symbol = %pair,
            msi = state.msi_value,
            direction = %state.direction,
            pattern = %state.pattern,
            "Market state refreshed"
        );
        state
    }

    /// Relative change against the last observed 24h volume, in [-1, 1]
    ///
    /// 0.0 on the first observation of a symbol.
    async fn volume_trend(&self, pair: &str, volume: f64) -> f64 {
        let mut volumes = self.volumes.lock().await;
        let previous = volumes.insert(pair.to_string(), volume);
        match previous {
            Some(prev) if prev > 0.0 && volume.is_finite() => ((volume - prev) / prev).clamp(-1.0, 1.0),
            _ => 0.0,
        }
    }

    async fn jittered_metrics(&self, price: f64) -> MarketMetrics {
        let mut rng = self.rng.lock().await;
        MarketMetrics {
            price,
            price_change_24h: rng.gen_range(-JITTER_PRICE_CHANGE..=JITTER_PRICE_CHANGE),
            volume_change: rng.gen_range(-JITTER_VOLUME_CHANGE..=JITTER_VOLUME_CHANGE),
        }
    }
}

/// `3·price_change + 2·volume_change + 0.5·weekend + 0.5·hour_factor`
pub fn sentiment_score(metrics: &MarketMetrics, hours: &SessionHours, now: DateTime<Utc>) -> f64 {
    coef::PRICE_CHANGE * metrics.price_change_24h
        + coef::VOLUME_CHANGE * metrics.volume_change
        + coef::WEEKEND * hours.weekend_flag(now)
        + coef::HOUR * hours.hour_factor(now)
}

/// `clamp(50 + 10·score, 5, 95)`, truncated to an integer
pub fn msi_from_score(score: f64) -> u8 {
    if !score.is_finite() {
        return msi::NEUTRAL;
    }
    let raw = (msi::NEUTRAL as f64 + coef::MSI_SCALE * score).clamp(msi::MIN as f64, msi::MAX as f64);
    raw as u8
}

/// Deterministic state from a set of metrics at a point in time
pub fn derive_state(
    symbol: &str,
    metrics: &MarketMetrics,
    hours: &SessionHours,
    now: DateTime<Utc>,
    source: StateSource,
) -> MarketState {
    let msi_value = msi_from_score(sentiment_score(metrics, hours, now));
    let direction = Direction::from_msi(msi_value);
    let pattern = ChartPattern::select(direction, metrics.price_change_24h, metrics.volume_change);

    MarketState {
        symbol: symbol.to_string(),
        price: metrics.price,
        direction,
        msi_value,
        pattern,
        price_change_24h: metrics.price_change_24h,
        volume_change: metrics.volume_change,
        source,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::services::market_api::testing::FakeMarketApi;
    use chrono::TimeZone;
    use std::time::Duration;

    fn manager(fake: Arc<FakeMarketApi>, config: MarketStateConfig) -> MarketStateManager {
        let prices = Arc::new(PriceSource::new(fake, DataConfig::default()));
        MarketStateManager::new(prices, config).unwrap()
    }

    fn seeded() -> MarketStateConfig {
        MarketStateConfig {
            jitter_seed: Some(7),
            ..MarketStateConfig::default()
        }
    }

    fn metrics(price_change_24h: f64, volume_change: f64) -> MarketMetrics {
        MarketMetrics {
            price: 100.0,
            price_change_24h,
            volume_change,
        }
    }

    // Monday 09:00 UTC: weekday, outside both hour windows
    fn quiet_hour() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_derive_state_neutral_weekday() {
        let state = derive_state("BTCUSDT", &metrics(0.02, 0.1), &SessionHours::default(), quiet_hour(), StateSource::Live);
        // 50 + 10 * (0.06 + 0.2) = 52.6
        assert_eq!(state.msi_value, 52);
        assert_eq!(state.direction, Direction::Neutral);
        assert_eq!(state.pattern, ChartPattern::Triangle);
    }

    #[test]
    fn test_derive_state_weekend_afternoon_bullish() {
        // Saturday 14:00 UTC: +0.5 weekend, +0.5 active hours
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 14, 0, 0).unwrap();
        let state = derive_state("BTCUSDT", &metrics(0.06, 0.5), &SessionHours::default(), now, StateSource::Live);
        // 50 + 10 * (0.18 + 1.0 + 0.5 + 0.5) = 71.8
        assert_eq!(state.msi_value, 71);
        assert_eq!(state.direction, Direction::Bullish);
        assert_eq!(state.pattern, ChartPattern::BullFlag);
    }

    #[test]
    fn test_derive_state_overnight_bearish() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 2, 0, 0).unwrap();
        let state = derive_state("ETHUSDT", &metrics(-0.04, -0.2), &SessionHours::default(), now, StateSource::Live);
        // 50 + 10 * (-0.12 - 0.4 - 0.25) = 42.3
        assert_eq!(state.msi_value, 42);
        assert_eq!(state.direction, Direction::Neutral);

        let crash = derive_state("ETHUSDT", &metrics(-0.08, 0.6), &SessionHours::default(), now, StateSource::Live);
        // 50 + 10 * (-0.24 + 1.2 - 0.25) = 57.1
        assert_eq!(crash.msi_value, 57);

        let dump = derive_state("ETHUSDT", &metrics(-0.08, -0.6), &SessionHours::default(), now, StateSource::Live);
        // 50 + 10 * (-0.24 - 1.2 - 0.25) = 33.1
        assert_eq!(dump.direction, Direction::Bearish);
        assert_eq!(dump.pattern, ChartPattern::DoubleTop);
    }

    #[test]
    fn test_msi_saturates() {
        let hours = SessionHours::default();
        let high = derive_state("BTCUSDT", &metrics(0.9, 0.9), &hours, quiet_hour(), StateSource::Live);
        assert_eq!(high.msi_value, 95);
        assert_eq!(high.direction, Direction::Bullish);

        let low = derive_state("BTCUSDT", &metrics(-0.9, -0.9), &hours, quiet_hour(), StateSource::Live);
        assert_eq!(low.msi_value, 5);
        assert_eq!(low.direction, Direction::Bearish);

        assert_eq!(msi_from_score(1e9), 95);
        assert_eq!(msi_from_score(f64::NAN), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_within_interval_are_identical() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        fake.set_ticker("BTCUSDT", 6.0, 1000.0);
        let mgr = manager(fake.clone(), seeded());

        let first = mgr.get_state("BTC").await;
        fake.set_price("BTCUSDT", 39000.0);
        fake.set_ticker("BTCUSDT", -9.0, 5000.0);
        tokio::time::advance(Duration::from_secs(120)).await;
        let second = mgr.get_state("BTCUSDT").await;

        assert_eq!(first.msi_value, second.msi_value);
        assert_eq!(first.direction, second.direction);
        assert_eq!(first.pattern, second.pattern);
        assert_eq!(second.price, 43000.0);
        assert_eq!(FakeMarketApi::calls(&fake.ticker_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_after_interval() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        fake.set_ticker("BTCUSDT", 1.0, 1000.0);
        let mgr = manager(fake.clone(), seeded());

        mgr.get_state("BTC").await;
        fake.set_price("BTCUSDT", 45000.0);
        fake.set_ticker("BTCUSDT", 4.0, 3000.0);
        tokio::time::advance(Duration::from_secs(301)).await;

        let state = mgr.get_state("BTC").await;
        assert_eq!(state.price, 45000.0);
        assert!((state.price_change_24h - 0.04).abs() < 1e-12);
        // Volume tripled against the previous observation, clamped
        assert_eq!(state.volume_change, 1.0);
        assert_eq!(state.source, StateSource::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_failure_gives_neutral_default() {
        let fake = Arc::new(FakeMarketApi::new());
        let mgr = manager(fake, seeded());

        let state = mgr.get_state("DOGE").await;
        assert_eq!(state.msi_value, 50);
        assert_eq!(state.direction, Direction::Neutral);
        assert_eq!(state.price, 0.0);
        assert_eq!(state.source, StateSource::Fallback);
        // Degraded output is flagged rather than hidden
        assert!(state.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_24h_stats_use_bounded_jitter() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("ADAUSDT", 0.45);
        let mgr = manager(fake, seeded());

        let state = mgr.get_state("ADA").await;
        assert_eq!(state.source, StateSource::Jitter);
        assert_eq!(state.price, 0.45);
        assert!(state.price_change_24h.abs() <= 0.01);
        assert!(state.volume_change.abs() <= 0.1);
        assert!((5..=95).contains(&state.msi_value));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_is_reproducible_with_seed() {
        let first = {
            let fake = Arc::new(FakeMarketApi::new());
            fake.set_price("ADAUSDT", 0.45);
            manager(fake, seeded()).get_state("ADA").await
        };
        let second = {
            let fake = Arc::new(FakeMarketApi::new());
            fake.set_price("ADAUSDT", 0.45);
            manager(fake, seeded()).get_state("ADA").await
        };
        assert_eq!(first.price_change_24h, second.price_change_24h);
        assert_eq!(first.volume_change, second.volume_change);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reads_refresh_once() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("SOLUSDT", 95.0);
        fake.set_ticker("SOLUSDT", 2.0, 100.0);
        let mgr = Arc::new(manager(fake.clone(), seeded()));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let mgr = mgr.clone();
                tokio::spawn(async move { mgr.get_state("SOL").await })
            })
            .collect();

        let mut states = Vec::new();
        for handle in handles {
            states.push(handle.await.unwrap());
        }
        assert!(states.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(FakeMarketApi::calls(&fake.ticker_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_policy_refreshes_every_symbol() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        fake.set_price("ETHUSDT", 2200.0);
        fake.set_ticker("BTCUSDT", 1.0, 1000.0);
        fake.set_ticker("ETHUSDT", 1.0, 1000.0);
        let config = MarketStateConfig {
            refresh_policy: RefreshPolicy::Batch,
            ..seeded()
        };
        let mgr = manager(fake.clone(), config).with_symbols(&["BTC".to_string(), "ETH".to_string()]);

        mgr.get_state("BTC").await;
        mgr.get_state("ETH").await;
        assert_eq!(mgr.tracked_symbols().await, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(FakeMarketApi::calls(&fake.ticker_calls), 2);

        fake.set_price("ETHUSDT", 2500.0);
        tokio::time::advance(Duration::from_secs(301)).await;

        // Reading BTC after expiry recomputes ETH as well
        mgr.get_state("BTC").await;
        assert_eq!(FakeMarketApi::calls(&fake.ticker_calls), 4);
        let eth = mgr.get_state("ETH").await;
        assert_eq!(eth.price, 2500.0);
        assert_eq!(FakeMarketApi::calls(&fake.ticker_calls), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_unpinned_symbols_are_evicted() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        fake.set_price("ETHUSDT", 2200.0);
        fake.set_ticker("ETHUSDT", 1.0, 1000.0);
        let mgr = manager(fake, seeded()).with_symbols(&["BTC".to_string()]);

        mgr.get_state("BTC").await;
        mgr.get_state("ETH").await;
        mgr.get_state("JUNK").await;
        assert_eq!(mgr.tracked_symbols().await, vec!["BTCUSDT", "ETHUSDT", "JUNKUSDT"]);
        assert!(mgr.volumes.lock().await.contains_key("ETHUSDT"));

        tokio::time::advance(Duration::from_secs(3 * 300 + 1)).await;
        mgr.get_state("BTC").await;

        assert_eq!(mgr.tracked_symbols().await, vec!["BTCUSDT"]);
        assert!(!mgr.volumes.lock().await.contains_key("ETHUSDT"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_refresh_skips_symbols_not_read_last_window() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        fake.set_ticker("BTCUSDT", 1.0, 1000.0);
        let config = MarketStateConfig {
            refresh_policy: RefreshPolicy::Batch,
            ..seeded()
        };
        let mgr = manager(fake.clone(), config).with_symbols(&["BTC".to_string()]);

        mgr.get_state("BTC").await;
        for i in 0..20 {
            mgr.get_state(&format!("JUNK{}", i)).await;
        }
        assert_eq!(mgr.tracked_symbols().await.len(), 21);

        tokio::time::advance(Duration::from_secs(301)).await;
        let before = FakeMarketApi::calls(&fake.price_calls);
        let start = Instant::now();
        let state = mgr.get_state("BTC").await;

        // Only BTC is refetched: one price and one ticker call behind the limiter
        assert_eq!(FakeMarketApi::calls(&fake.price_calls), before + 1);
        assert!(start.elapsed() <= Duration::from_secs(12));
        assert_eq!(state.source, StateSource::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overview_preserves_order() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 43000.0);
        fake.set_price("XRPUSDT", 0.52);
        let mgr = manager(fake, seeded());

        let symbols = vec!["XRP".to_string(), "BTC".to_string()];
        let states = mgr.overview(&symbols).await;
        assert_eq!(states[0].symbol, "XRPUSDT");
        assert_eq!(states[1].symbol, "BTCUSDT");
    }
}
