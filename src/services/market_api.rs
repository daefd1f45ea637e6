//! Market data transport
//!
//! [`MarketDataProvider`] is the seam between the pipeline and the outside
//! world. [`HttpMarketApi`] talks to the public endpoints:
//!
//! - `GET {market}/ticker/price?symbol=` → `{"price": "43250.10"}`
//! - `GET {market}/ticker/24hr?symbol=` → `{"priceChangePercent", "volume", "quoteVolume"}`
//! - `GET {history}/coins/{id}/market_chart/range` → `{"prices": [[ms, price], ...]}`
//! - `GET {fx}/latest/{base}` → `{"rates": {"GBP": 0.79, ...}}`
//!
//! Each call is a single attempt. Spacing, caching and the 429 retry live
//! in [`crate::services::PriceSource`].

use crate::config::DataConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// 24h rolling statistics for one pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ticker24h {
    /// Price change over 24h, in percent
    pub price_change_percent: f64,
    /// Base-asset volume over 24h
    pub volume: f64,
    /// Quote-asset volume over 24h
    pub quote_volume: f64,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Latest price for a trading pair, in the quote currency
    async fn fetch_price(&self, pair: &str) -> Result<f64>;

    async fn fetch_24h_ticker(&self, pair: &str) -> Result<Ticker24h>;

    /// Raw `(timestamp_ms, price)` samples between `from` and `to`
    async fn fetch_price_history(
        &self,
        coin_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(i64, f64)>>;

    /// Units of `target` per unit of `base`
    async fn fetch_fx_rate(&self, base: &str, target: &str) -> Result<f64>;
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerResponse {
    price_change_percent: String,
    volume: String,
    quote_volume: String,
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
}

#[derive(Debug, Deserialize)]
struct FxResponse {
    rates: HashMap<String, f64>,
}

fn parse_decimal(field: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::MalformedResponse(format!("{} is not a number: '{}'", field, value)))
}

/// reqwest-backed provider for the public market, history and FX APIs
pub struct HttpMarketApi {
    client: Client,
    market_api_url: String,
    history_api_url: String,
    fx_api_url: String,
}

impl HttpMarketApi {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `config` - Endpoint URLs and request timeout
    pub fn new(config: &DataConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            market_api_url: config.market_api_url.trim_end_matches('/').to_string(),
            history_api_url: config.history_api_url.trim_end_matches('/').to_string(),
            fx_api_url: config.fx_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET `url` and decode the JSON body
    ///
    /// 429 maps to `RateLimited`, any other non-success status to
    /// `UpstreamUnavailable`, an unexpected body to `MalformedResponse`.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("{} ({})", e, url)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(url = %url, "Upstream returned 429");
            return Err(AppError::RateLimited);
        }
        if !status.is_success() {
            return Err(AppError::UpstreamUnavailable(format!("HTTP {} from {}", status, url)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Failed to read body: {}", e)))?;

        serde_json::from_str::<T>(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            warn!(url = %url, error = %e, body = %preview, "Unexpected response shape");
            AppError::MalformedResponse(format!("{} ({})", e, url))
        })
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketApi {
    async fn fetch_price(&self, pair: &str) -> Result<f64> {
        let url = format!("{}/ticker/price", self.market_api_url);
        let resp: PriceResponse = self.get_json(&url, &[("symbol", pair.to_string())]).await?;
        parse_decimal("price", &resp.price)
    }

    async fn fetch_24h_ticker(&self, pair: &str) -> Result<Ticker24h> {
        let url = format!("{}/ticker/24hr", self.market_api_url);
        let resp: TickerResponse = self.get_json(&url, &[("symbol", pair.to_string())]).await?;
        Ok(Ticker24h {
            price_change_percent: parse_decimal("priceChangePercent", &resp.price_change_percent)?,
            volume: parse_decimal("volume", &resp.volume)?,
            quote_volume: parse_decimal("quoteVolume", &resp.quote_volume)?,
        })
    }

    async fn fetch_price_history(
        &self,
        coin_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(i64, f64)>> {
        let url = format!("{}/coins/{}/market_chart/range", self.history_api_url, coin_id);
        let query = [
            ("vs_currency", "usd".to_string()),
            ("from", from.timestamp().to_string()),
            ("to", to.timestamp().to_string()),
        ];
        let resp: MarketChartResponse = self.get_json(&url, &query).await?;
        Ok(resp
            .prices
            .into_iter()
            .map(|(ts, price)| (ts as i64, price))
            .collect())
    }

    async fn fetch_fx_rate(&self, base: &str, target: &str) -> Result<f64> {
        let url = format!("{}/latest/{}", self.fx_api_url, base.to_uppercase());
        let resp: FxResponse = self.get_json(&url, &[]).await?;
        resp.rates
            .get(&target.to_uppercase())
            .copied()
            .ok_or_else(|| AppError::MalformedResponse(format!("No {} rate for {}", target, base)))
    }
}

/// In-memory provider with scripted failures and call counters
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeMarketApi {
        prices: Mutex<HashMap<String, f64>>,
        tickers: Mutex<HashMap<String, Ticker24h>>,
        history: Mutex<HashMap<String, Vec<(i64, f64)>>>,
        fx_rate: Mutex<Option<f64>>,
        price_errors: Mutex<VecDeque<AppError>>,
        history_errors: Mutex<VecDeque<AppError>>,
        pub price_calls: AtomicUsize,
        pub ticker_calls: AtomicUsize,
        pub history_calls: AtomicUsize,
        pub fx_calls: AtomicUsize,
    }

    impl FakeMarketApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_price(&self, pair: &str, price: f64) {
            self.prices.lock().unwrap().insert(pair.to_string(), price);
        }

        pub fn set_ticker(&self, pair: &str, price_change_percent: f64, volume: f64) {
            self.tickers.lock().unwrap().insert(
                pair.to_string(),
                Ticker24h {
                    price_change_percent,
                    volume,
                    quote_volume: volume,
                },
            );
        }

        pub fn set_history(&self, coin_id: &str, samples: Vec<(i64, f64)>) {
            self.history.lock().unwrap().insert(coin_id.to_string(), samples);
        }

        pub fn set_fx_rate(&self, rate: Option<f64>) {
            *self.fx_rate.lock().unwrap() = rate;
        }

        /// Queue an error returned by the next price call
        pub fn fail_next_price(&self, err: AppError) {
            self.price_errors.lock().unwrap().push_back(err);
        }

        pub fn fail_next_history(&self, err: AppError) {
            self.history_errors.lock().unwrap().push_back(err);
        }

        pub fn calls(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for FakeMarketApi {
        async fn fetch_price(&self, pair: &str) -> Result<f64> {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.price_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.prices
                .lock()
                .unwrap()
                .get(pair)
                .copied()
                .ok_or_else(|| AppError::UpstreamUnavailable(format!("unknown pair {}", pair)))
        }

        async fn fetch_24h_ticker(&self, pair: &str) -> Result<Ticker24h> {
            self.ticker_calls.fetch_add(1, Ordering::SeqCst);
            self.tickers
                .lock()
                .unwrap()
                .get(pair)
                .copied()
                .ok_or_else(|| AppError::UpstreamUnavailable(format!("no ticker for {}", pair)))
        }

        async fn fetch_price_history(
            &self,
            coin_id: &str,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<(i64, f64)>> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.history_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.history
                .lock()
                .unwrap()
                .get(coin_id)
                .cloned()
                .ok_or_else(|| AppError::UpstreamUnavailable(format!("no history for {}", coin_id)))
        }

        async fn fetch_fx_rate(&self, _base: &str, _target: &str) -> Result<f64> {
            self.fx_calls.fetch_add(1, Ordering::SeqCst);
            self.fx_rate
                .lock()
                .unwrap()
                .ok_or_else(|| AppError::UpstreamUnavailable("fx down".to_string()))
        }
    }
}
