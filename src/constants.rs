//! Default Parameters
//!
//! Documented defaults for every tunable in the signal pipeline. All of them
//! can be overridden through [`crate::config::AppConfig`].
//!
//! ## Indicator Windows
//!
//! | Indicator       | Default      |
//! |-----------------|--------------|
//! | RSI             | 14 (30 / 70) |
//! | MACD            | 12 / 26 / 9  |
//! | Bollinger Bands | 20, 2σ       |

/// RSI lookback period
pub const DEFAULT_RSI_PERIOD: usize = 14;
/// RSI level above which the market is treated as overbought
pub const DEFAULT_RSI_OVERBOUGHT: f64 = 70.0;
/// RSI level below which the market is treated as oversold
pub const DEFAULT_RSI_OVERSOLD: f64 = 30.0;

pub const DEFAULT_MACD_FAST: usize = 12;
pub const DEFAULT_MACD_SLOW: usize = 26;
pub const DEFAULT_MACD_SIGNAL: usize = 9;

pub const DEFAULT_BOLLINGER_PERIOD: usize = 20;
pub const DEFAULT_BOLLINGER_STD: f64 = 2.0;

/// Score contributions of the rule-based technical scorer
pub mod score_weights {
    pub const RSI: f64 = 0.3;
    pub const MACD: f64 = 0.3;
    pub const BOLLINGER: f64 = 0.4;
}

/// Weight of the technical confidence in the fused signal
pub const DEFAULT_TECHNICAL_WEIGHT: f64 = 0.7;
/// Weight of the sentiment confidence in the fused signal
pub const DEFAULT_SENTIMENT_WEIGHT: f64 = 0.3;
/// Minimum fused confidence for a BUY
pub const DEFAULT_SIGNAL_THRESHOLD: f64 = 0.7;

/// Neutral sentiment score
pub const NEUTRAL_SENTIMENT: f64 = 0.5;
/// Recency weights run linearly from this value (oldest) to 1.0 (newest)
pub const OLDEST_TEXT_WEIGHT: f64 = 0.5;
pub const DEFAULT_NEWS_LOOKBACK_HOURS: i64 = 24;
/// Sentiment score above which text is reported as positive
pub const DEFAULT_POSITIVE_SENTIMENT_THRESHOLD: f64 = 0.6;

/// Current-price cache lifetime
pub const DEFAULT_PRICE_CACHE_TTL_SECS: u64 = 60;
/// Minimum spacing between two calls to the price API, process-wide
pub const DEFAULT_MIN_REQUEST_INTERVAL_SECS: u64 = 6;
/// Wait before the single retry after an HTTP 429
pub const DEFAULT_RATE_LIMIT_BACKOFF_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HISTORY_LOOKBACK_DAYS: i64 = 30;

/// USD → GBP rate used when the FX lookup fails
pub const FALLBACK_USD_TO_GBP_RATE: f64 = 0.78;

pub const DEFAULT_MARKET_API_URL: &str = "https://api.binance.com/api/v3";
pub const DEFAULT_HISTORY_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_FX_API_URL: &str = "https://api.exchangerate-api.com/v4";
pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2";
pub const DEFAULT_SOCIAL_API_URL: &str = "https://api.twitter.com/2";

/// Quote asset appended to bare tickers (BTC → BTCUSDT)
pub const QUOTE_ASSET: &str = "USDT";

/// Market-state refresh interval
pub const DEFAULT_STATE_REFRESH_SECS: u64 = 300;
/// Unconfigured symbols unread for this many refresh intervals are forgotten
pub const STATE_IDLE_INTERVALS: u32 = 3;

/// Market Sentiment Index bounds and direction cut-offs
pub mod msi {
    pub const NEUTRAL: u8 = 50;
    pub const MIN: u8 = 5;
    pub const MAX: u8 = 95;
    pub const BULLISH_AT: u8 = 65;
    pub const BEARISH_AT: u8 = 35;
}

/// Coefficients of the derived market sentiment score
pub mod sentiment_coefficients {
    pub const PRICE_CHANGE: f64 = 3.0;
    pub const VOLUME_CHANGE: f64 = 2.0;
    pub const WEEKEND: f64 = 0.5;
    pub const HOUR: f64 = 0.5;
    /// MSI points per unit of sentiment score
    pub const MSI_SCALE: f64 = 10.0;
}

/// Hour factor contributions
pub const ACTIVE_HOURS_FACTOR: f64 = 1.0;
pub const OVERNIGHT_HOURS_FACTOR: f64 = -0.5;

/// Jitter bounds used when 24h metrics are unavailable
pub const JITTER_PRICE_CHANGE: f64 = 0.01;
pub const JITTER_VOLUME_CHANGE: f64 = 0.1;

/// Analysis pass cadence
pub const DEFAULT_ANALYSIS_INTERVAL_SECS: u64 = 3600;

pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Symbols analysed when none are configured
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "BTC", "ETH", "XRP", "HBAR", "BNB", "ADA", "DOGE", "SOL", "DOT", "MATIC",
];

/// Trading pair → CoinGecko coin id
///
/// Pairs missing here fall back to the lower-cased base asset.
pub const COIN_IDS: &[(&str, &str)] = &[
    ("BTCUSDT", "bitcoin"),
    ("ETHUSDT", "ethereum"),
    ("BNBUSDT", "binancecoin"),
    ("ADAUSDT", "cardano"),
    ("DOGEUSDT", "dogecoin"),
    ("XRPUSDT", "ripple"),
    ("HBARUSDT", "hedera-hashgraph"),
    ("SOLUSDT", "solana"),
    ("DOTUSDT", "polkadot"),
    ("MATICUSDT", "matic-network"),
];
