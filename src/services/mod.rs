pub mod feeds;
pub mod lexicon;
pub mod market_api;
pub mod market_state;
pub mod pipeline;
pub mod price_source;
pub mod rate_limiter;
pub mod report;
pub mod sentiment;
pub mod session_hours;
pub mod signal_generator;
pub mod technical;

pub use feeds::{NewsArticle, NewsFeed, SocialFeed};
pub use market_api::{HttpMarketApi, MarketDataProvider, Ticker24h};
pub use market_state::{derive_state, MarketStateManager};
pub use pipeline::SignalPipeline;
pub use price_source::PriceSource;
pub use rate_limiter::RateLimiter;
pub use report::Reporter;
pub use sentiment::{PolarityModel, SentimentAnalyzer};
pub use session_hours::SessionHours;
pub use signal_generator::SignalGenerator;
pub use technical::TechnicalAnalyzer;
