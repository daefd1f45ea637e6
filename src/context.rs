use crate::config::AppConfig;
use crate::error::Result;
use crate::models::SymbolOutcome;
use crate::services::feeds::{NewsApiClient, NewsFeed, SocialApiClient, SocialFeed};
use crate::services::market_api::{HttpMarketApi, MarketDataProvider};
use crate::services::{MarketStateManager, PriceSource, Reporter, SignalPipeline};
use crate::utils::pair_symbol;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Analysis worker progress, exposed by the health endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkerHealth {
    pub iteration_count: u64,
    pub last_pass: Option<DateTime<Utc>>,
    pub last_pass_secs: Option<f64>,
    pub available: usize,
    pub unavailable: usize,
}

/// An outcome and when it was published
#[derive(Debug, Clone)]
pub struct PublishedOutcome {
    pub outcome: SymbolOutcome,
    pub published: tokio::time::Instant,
}

/// Shared services with one lifetime: the rate limiter, price cache and
/// market-state cache all live here instead of in module globals
pub struct AppContext {
    pub config: AppConfig,
    pub prices: Arc<PriceSource>,
    pub market_states: Arc<MarketStateManager>,
    pub pipeline: Arc<SignalPipeline>,
    /// Latest outcome per configured pair
    pub latest: RwLock<HashMap<String, PublishedOutcome>>,
    pub health: RwLock<WorkerHealth>,
    pub started_at: Instant,
}

pub type SharedContext = Arc<AppContext>;

impl AppContext {
    /// Wire the HTTP market API and the configured text feeds
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let timeout = config.data.request_timeout();
        let provider: Arc<dyn MarketDataProvider> = Arc::new(HttpMarketApi::new(&config.data)?);
        let news: Arc<dyn NewsFeed> = Arc::new(NewsApiClient::new(
            &config.feeds,
            config.sentiment.news_lookback_hours,
            timeout,
        )?);
        let social: Arc<dyn SocialFeed> = Arc::new(SocialApiClient::new(&config.feeds, timeout)?);
        Self::with_sources(config, provider, news, social)
    }

    /// Wire explicit data sources
    pub fn with_sources(
        config: AppConfig,
        provider: Arc<dyn MarketDataProvider>,
        news: Arc<dyn NewsFeed>,
        social: Arc<dyn SocialFeed>,
    ) -> Result<Self> {
        config.validate()?;
        let prices = Arc::new(PriceSource::new(provider, config.data.clone()));
        let market_states = Arc::new(
            MarketStateManager::new(prices.clone(), config.market_state.clone())?.with_symbols(&config.symbols),
        );
        let pipeline = Arc::new(SignalPipeline::new(&config, prices.clone(), news, social));

        Ok(Self {
            config,
            prices,
            market_states,
            pipeline,
            latest: RwLock::new(HashMap::new()),
            health: RwLock::new(WorkerHealth::default()),
            started_at: Instant::now(),
        })
    }

    pub fn reporter(&self) -> Reporter {
        Reporter::new(&self.config.report, &self.config.sentiment)
    }

    /// True when `symbol` is one of the configured pairs
    pub fn is_configured(&self, symbol: &str) -> bool {
        let pair = pair_symbol(symbol);
        self.config.symbols.iter().any(|s| pair_symbol(s) == pair)
    }

    /// Record outcomes for configured pairs; others are dropped
    pub async fn publish(&self, outcomes: &[SymbolOutcome]) {
        let now = tokio::time::Instant::now();
        let mut latest = self.latest.write().await;
        for outcome in outcomes.iter().filter(|o| self.is_configured(o.symbol())) {
            latest.insert(
                outcome.symbol().to_string(),
                PublishedOutcome {
                    outcome: outcome.clone(),
                    published: now,
                },
            );
        }
    }

    /// Published outcome for `pair` younger than one analysis interval
    pub async fn fresh_outcome(&self, pair: &str) -> Option<SymbolOutcome> {
        let latest = self.latest.read().await;
        latest
            .get(pair)
            .filter(|p| p.published.elapsed() < self.config.worker.analysis_interval())
            .map(|p| p.outcome.clone())
    }
}
