//! Layered configuration
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults (see [`crate::constants`])
//! 2. optional `cryptosignals.toml` (or the file named by `CRYPTOSIGNALS_CONFIG`)
//! 3. `CRYPTOSIGNALS__SECTION__KEY` environment variables (a local `.env` is loaded first)

use crate::constants::*;
use crate::error::{AppError, Result};
use crate::models::Interval;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "CRYPTOSIGNALS";
const CONFIG_PATH_VAR: &str = "CRYPTOSIGNALS_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "cryptosignals";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub symbols: Vec<String>,
    pub technical: TechnicalConfig,
    pub signal: SignalConfig,
    pub sentiment: SentimentConfig,
    pub data: DataConfig,
    pub market_state: MarketStateConfig,
    pub feeds: FeedsConfig,
    pub worker: WorkerConfig,
    pub server: ServerConfig,
    pub report: ReportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            technical: TechnicalConfig::default(),
            signal: SignalConfig::default(),
            sentiment: SentimentConfig::default(),
            data: DataConfig::default(),
            market_state: MarketStateConfig::default(),
            feeds: FeedsConfig::default(),
            worker: WorkerConfig::default(),
            server: ServerConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load defaults, then the optional config file, then the environment
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        debug!(path = %path, "Loading configuration");

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("symbols"),
            )
            .build()?;

        let cfg: AppConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        self.technical.validate()?;
        self.signal.validate()?;

        if !(self.data.fallback_fx_rate > 0.0) {
            return Err(AppError::Config(format!(
                "fallback_fx_rate must be positive, got {}",
                self.data.fallback_fx_rate
            )));
        }
        if self.worker.analysis_interval_secs == 0 {
            return Err(AppError::Config("worker.analysis_interval_secs must be > 0".to_string()));
        }
        if !(self.sentiment.positive_threshold > 0.5 && self.sentiment.positive_threshold <= 1.0) {
            return Err(AppError::Config(format!(
                "sentiment.positive_threshold must be in (0.5, 1], got {}",
                self.sentiment.positive_threshold
            )));
        }
        if self.market_state.refresh_interval_secs == 0 {
            return Err(AppError::Config("market_state.refresh_interval_secs must be > 0".to_string()));
        }
        self.market_state.active_hours.validate("active_hours")?;
        self.market_state.overnight_hours.validate("overnight_hours")?;
        if self.market_state.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(AppError::Config(format!(
                "Unknown timezone '{}'",
                self.market_state.timezone
            )));
        }
        Ok(())
    }
}

/// Indicator windows and RSI thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalConfig {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            rsi_period: DEFAULT_RSI_PERIOD,
            rsi_overbought: DEFAULT_RSI_OVERBOUGHT,
            rsi_oversold: DEFAULT_RSI_OVERSOLD,
            macd_fast: DEFAULT_MACD_FAST,
            macd_slow: DEFAULT_MACD_SLOW,
            macd_signal: DEFAULT_MACD_SIGNAL,
            bollinger_period: DEFAULT_BOLLINGER_PERIOD,
            bollinger_std: DEFAULT_BOLLINGER_STD,
        }
    }
}

impl TechnicalConfig {
    /// Samples needed before every indicator has a value at the last index
    pub fn min_samples(&self) -> usize {
        self.rsi_period
            .max(self.macd_slow + self.macd_signal)
            .max(self.bollinger_period)
            + 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.rsi_period == 0
            || self.macd_fast == 0
            || self.macd_signal == 0
            || self.bollinger_period == 0
        {
            return Err(AppError::Config("indicator periods must be > 0".to_string()));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(AppError::Config(format!(
                "macd_fast ({}) must be shorter than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(AppError::Config(format!(
                "RSI thresholds must satisfy 0 <= oversold ({}) < overbought ({}) <= 100",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        if !(self.bollinger_std > 0.0) {
            return Err(AppError::Config("bollinger_std must be positive".to_string()));
        }
        Ok(())
    }
}

/// Fusion weights and BUY threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub technical_weight: f64,
    pub sentiment_weight: f64,
    pub threshold: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            technical_weight: DEFAULT_TECHNICAL_WEIGHT,
            sentiment_weight: DEFAULT_SENTIMENT_WEIGHT,
            threshold: DEFAULT_SIGNAL_THRESHOLD,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.technical_weight < 0.0 || self.sentiment_weight < 0.0 {
            return Err(AppError::Config("signal weights must be non-negative".to_string()));
        }
        if (self.technical_weight + self.sentiment_weight - 1.0).abs() > 1e-9 {
            return Err(AppError::Config(format!(
                "signal weights must sum to 1.0, got {} + {}",
                self.technical_weight, self.sentiment_weight
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(AppError::Config(format!(
                "signal threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub news_lookback_hours: i64,
    /// Sentiment at or above this reads as positive in reports; at or below
    /// `1 - positive_threshold` as negative
    pub positive_threshold: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            news_lookback_hours: DEFAULT_NEWS_LOOKBACK_HOURS,
            positive_threshold: DEFAULT_POSITIVE_SENTIMENT_THRESHOLD,
        }
    }
}

/// Upstream endpoints, caching and rate limiting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub market_api_url: String,
    pub history_api_url: String,
    pub fx_api_url: String,
    pub quote_currency: String,
    pub display_currency: String,
    pub fallback_fx_rate: f64,
    pub price_cache_ttl_secs: u64,
    pub min_request_interval_secs: u64,
    pub rate_limit_backoff_secs: u64,
    pub request_timeout_secs: u64,
    pub history_interval: Interval,
    pub history_lookback_days: i64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            market_api_url: DEFAULT_MARKET_API_URL.to_string(),
            history_api_url: DEFAULT_HISTORY_API_URL.to_string(),
            fx_api_url: DEFAULT_FX_API_URL.to_string(),
            quote_currency: "USD".to_string(),
            display_currency: "GBP".to_string(),
            fallback_fx_rate: FALLBACK_USD_TO_GBP_RATE,
            price_cache_ttl_secs: DEFAULT_PRICE_CACHE_TTL_SECS,
            min_request_interval_secs: DEFAULT_MIN_REQUEST_INTERVAL_SECS,
            rate_limit_backoff_secs: DEFAULT_RATE_LIMIT_BACKOFF_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            history_interval: Interval::Hour1,
            history_lookback_days: DEFAULT_HISTORY_LOOKBACK_DAYS,
        }
    }
}

impl DataConfig {
    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.price_cache_ttl_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs(self.min_request_interval_secs)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// How staleness of cached market states is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Each symbol expires `refresh_interval` after its own update
    PerSymbol,
    /// One shared timestamp; when it expires every tracked symbol is recomputed
    Batch,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshPolicy::PerSymbol
    }
}

/// Half-open hour range `[start, end)` in the market timezone; wraps past midnight when `start > end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.start > 23 || self.end > 24 {
            return Err(AppError::Config(format!(
                "{} must use hours 0-24, got {}..{}",
                name, self.start, self.end
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketStateConfig {
    pub refresh_interval_secs: u64,
    pub refresh_policy: RefreshPolicy,
    /// IANA timezone used for the weekend and hour factors
    pub timezone: String,
    pub active_hours: HourWindow,
    pub overnight_hours: HourWindow,
    /// Seed for the fallback jitter; entropy-seeded when absent
    pub jitter_seed: Option<u64>,
}

impl Default for MarketStateConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_STATE_REFRESH_SECS,
            refresh_policy: RefreshPolicy::default(),
            timezone: "UTC".to_string(),
            active_hours: HourWindow::new(13, 21),
            overnight_hours: HourWindow::new(0, 5),
            jitter_seed: None,
        }
    }
}

impl MarketStateConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Credentials for the optional text feeds; a missing key disables the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub news_api_url: String,
    pub news_api_key: Option<String>,
    pub social_api_url: String,
    pub social_bearer_token: Option<String>,
    pub social_max_results: u32,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            news_api_url: DEFAULT_NEWS_API_URL.to_string(),
            news_api_key: None,
            social_api_url: DEFAULT_SOCIAL_API_URL.to_string(),
            social_bearer_token: None,
            social_max_results: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub analysis_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            analysis_interval_secs: DEFAULT_ANALYSIS_INTERVAL_SECS,
        }
    }
}

impl WorkerConfig {
    /// Pass cadence; also the age after which a published outcome is stale
    pub fn analysis_interval(&self) -> Duration {
        Duration::from_secs(self.analysis_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
        }
    }
}

/// Wording used by the text reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStyle {
    Simple,
    Advanced,
}

impl Default for ReportStyle {
    fn default() -> Self {
        ReportStyle::Simple
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReportConfig {
    pub style: ReportStyle,
    /// Seed for picking among equivalent phrasings; entropy-seeded when absent
    pub phrasing_seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.technical.rsi_period, 14);
        assert_eq!(cfg.technical.macd_slow, 26);
        assert_eq!(cfg.signal.threshold, 0.7);
        assert_eq!(cfg.data.price_cache_ttl_secs, 60);
        assert_eq!(cfg.data.min_request_interval_secs, 6);
        assert_eq!(cfg.market_state.refresh_interval_secs, 300);
        assert_eq!(cfg.market_state.refresh_policy, RefreshPolicy::PerSymbol);
    }

    #[test]
    fn test_min_samples() {
        // max(14, 26 + 9, 20) + 1
        assert_eq!(TechnicalConfig::default().min_samples(), 36);
    }

    #[test]
    fn test_rejects_inverted_macd() {
        let cfg = TechnicalConfig {
            macd_fast: 26,
            macd_slow: 12,
            ..TechnicalConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_weights_not_summing_to_one() {
        let cfg = SignalConfig {
            technical_weight: 0.7,
            sentiment_weight: 0.7,
            threshold: 0.7,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_analysis_interval() {
        let mut cfg = AppConfig::default();
        cfg.worker.analysis_interval_secs = 0;
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_positive_threshold_below_half() {
        let mut cfg = AppConfig::default();
        cfg.sentiment.positive_threshold = 0.4;
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_hour_window_wraps_midnight() {
        let window = HourWindow::new(22, 4);
        assert!(window.contains(23));
        assert!(window.contains(0));
        assert!(window.contains(3));
        assert!(!window.contains(4));
        assert!(!window.contains(12));

        let day = HourWindow::new(13, 21);
        assert!(day.contains(13));
        assert!(!day.contains(21));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[technical]\nrsi_period = 21\n[market_state]\nrefresh_policy = \"batch\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let cfg: AppConfig = settings.try_deserialize().unwrap();
        assert_eq!(cfg.technical.rsi_period, 21);
        assert_eq!(cfg.technical.macd_fast, 12);
        assert_eq!(cfg.market_state.refresh_policy, RefreshPolicy::Batch);
        assert_eq!(cfg.symbols.len(), 10);
    }
}
