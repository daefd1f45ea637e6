use crate::context::{SharedContext, WorkerHealth};
use crate::models::{MarketState, SymbolOutcome};
use crate::utils::pair_symbol;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub symbols: Vec<String>,
    pub tracked_states: Vec<String>,
    pub worker: WorkerHealth,
}

/// Market state plus the price targets of its pattern
#[derive(Debug, Serialize)]
pub struct StateResponse {
    #[serde(flatten)]
    pub state: MarketState,
    pub degraded: bool,
    pub pattern_targets: Vec<f64>,
}

impl From<MarketState> for StateResponse {
    fn from(state: MarketState) -> Self {
        Self {
            degraded: state.is_degraded(),
            pattern_targets: state.pattern_targets(),
            state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub symbol: String,
    pub price: f64,
    pub quote_currency: String,
    pub display_price: f64,
    pub display_currency: String,
}

/// GET /health - Uptime and analysis worker progress
pub async fn health_handler(State(ctx): State<SharedContext>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok",
        uptime_secs: ctx.started_at.elapsed().as_secs(),
        symbols: ctx.config.symbols.clone(),
        tracked_states: ctx.market_states.tracked_symbols().await,
        worker: ctx.health.read().await.clone(),
    };
    (StatusCode::OK, Json(response))
}

/// GET /signal/{symbol} - Latest signal, analysing on demand when none is fresh
///
/// Only available outcomes of configured symbols are kept for later requests.
pub async fn signal_handler(
    State(ctx): State<SharedContext>,
    Path(symbol): Path<String>,
) -> Response {
    let pair = pair_symbol(&symbol);

    let outcome = match ctx.fresh_outcome(&pair).await {
        Some(outcome) => outcome,
        None => {
            info!(symbol = %pair, "No fresh signal, analysing on demand");
            let outcome = ctx.pipeline.analyze_symbol(&pair).await;
            if outcome.signal().is_some() {
                ctx.publish(std::slice::from_ref(&outcome)).await;
            }
            outcome
        }
    };

    match outcome {
        SymbolOutcome::Available(signal) => (StatusCode::OK, Json(signal)).into_response(),
        unavailable => (StatusCode::SERVICE_UNAVAILABLE, Json(unavailable)).into_response(),
    }
}

/// GET /state/{symbol} - Cached market state, refreshed when stale
pub async fn state_handler(
    State(ctx): State<SharedContext>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    let state = ctx.market_states.get_state(&symbol).await;
    Json(StateResponse::from(state))
}

/// GET /overview - Market states of every configured symbol
pub async fn overview_handler(State(ctx): State<SharedContext>) -> impl IntoResponse {
    let states: Vec<StateResponse> = ctx
        .market_states
        .overview(&ctx.config.symbols)
        .await
        .into_iter()
        .map(StateResponse::from)
        .collect();
    Json(states)
}

/// GET /price/{symbol} - Spot price in the quote and display currencies
pub async fn price_handler(
    State(ctx): State<SharedContext>,
    Path(symbol): Path<String>,
) -> Response {
    let pair = pair_symbol(&symbol);
    match ctx.prices.get_current_price(&pair).await {
        Ok(price) => {
            let data = ctx.prices.config();
            let response = PriceResponse {
                symbol: pair,
                price,
                quote_currency: data.quote_currency.clone(),
                display_price: ctx.prices.to_display_currency(price).await,
                display_currency: data.display_currency.clone(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            warn!(symbol = %pair, error = %e, "Price not available");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "symbol": pair,
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::context::AppContext;
    use crate::services::feeds::testing::StaticFeed;
    use crate::services::market_api::testing::FakeMarketApi;
    use std::sync::Arc;
    use std::time::Duration;

    fn context(fake: Arc<FakeMarketApi>) -> SharedContext {
        let config = AppConfig {
            symbols: vec!["BTC".to_string(), "ETH".to_string()],
            ..AppConfig::default()
        };
        let feed = Arc::new(StaticFeed::default());
        Arc::new(AppContext::with_sources(config, fake, feed.clone(), feed).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_available_is_ok() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 140.0);
        fake.set_history("bitcoin", (0..40).map(|i| (i * 3_600_000, 100.0 + i as f64)).collect());
        let ctx = context(fake);

        let response = signal_handler(State(ctx.clone()), Path("btc".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        // Published for later requests
        assert!(ctx.latest.read().await.contains_key("BTCUSDT"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_unavailable_is_503() {
        let ctx = context(Arc::new(FakeMarketApi::new()));
        let response = signal_handler(State(ctx), Path("ETH".to_string())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_served_from_worker_cache() {
        let fake = Arc::new(FakeMarketApi::new());
        let ctx = context(fake.clone());
        ctx.publish(&[SymbolOutcome::Unavailable {
            symbol: "BTCUSDT".to_string(),
            reason: "Rate limit exceeded".to_string(),
        }])
        .await;

        let response = signal_handler(State(ctx), Path("BTC".to_string())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(FakeMarketApi::calls(&fake.price_calls), 0);
    }

    fn rising_history(fake: &FakeMarketApi, pair: &str, coin: &str) {
        fake.set_price(pair, 140.0);
        fake.set_history(coin, (0..40).map(|i| (i * 3_600_000, 100.0 + i as f64)).collect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_symbol_recovers_after_upstream_returns() {
        let fake = Arc::new(FakeMarketApi::new());
        let ctx = context(fake.clone());

        let first = signal_handler(State(ctx.clone()), Path("DOGE".to_string())).await;
        assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);

        rising_history(&fake, "DOGEUSDT", "dogecoin");
        tokio::time::advance(Duration::from_secs(6 * 3600)).await;

        let second = signal_handler(State(ctx.clone()), Path("DOGE".to_string())).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(FakeMarketApi::calls(&fake.price_calls), 2);
        // Not configured, so nothing is kept
        assert!(ctx.latest.read().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_symbols_do_not_grow_latest() {
        let ctx = context(Arc::new(FakeMarketApi::new()));
        for i in 0..25 {
            let response = signal_handler(State(ctx.clone()), Path(format!("JUNK{}", i))).await;
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
        assert!(ctx.latest.read().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_worker_outcome_is_reanalysed() {
        let fake = Arc::new(FakeMarketApi::new());
        let ctx = context(fake.clone());
        ctx.publish(&[SymbolOutcome::Unavailable {
            symbol: "BTCUSDT".to_string(),
            reason: "Rate limit exceeded".to_string(),
        }])
        .await;

        rising_history(&fake, "BTCUSDT", "bitcoin");
        tokio::time::advance(ctx.config.worker.analysis_interval() + Duration::from_secs(1)).await;

        let response = signal_handler(State(ctx.clone()), Path("BTC".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let latest = ctx.latest.read().await;
        assert!(latest["BTCUSDT"].outcome.signal().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_handler_status() {
        let fake = Arc::new(FakeMarketApi::new());
        fake.set_price("BTCUSDT", 50_000.0);
        let ctx = context(fake);

        let ok = price_handler(State(ctx.clone()), Path("BTC".to_string())).await;
        assert_eq!(ok.status(), StatusCode::OK);
        let missing = price_handler(State(ctx), Path("SOL".to_string())).await;
        assert_eq!(missing.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_response_flags_fallback() {
        let ctx = context(Arc::new(FakeMarketApi::new()));
        let state = ctx.market_states.get_state("BTC").await;
        let response = StateResponse::from(state);
        assert!(response.degraded);
        assert_eq!(response.state.symbol, "BTCUSDT");
    }
}
