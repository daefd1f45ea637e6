//! News and social text feeds
//!
//! Both feeds are optional inputs to the sentiment score. A feed without
//! credentials, or one whose upstream fails, yields no texts instead of an
//! error so the analysis pass carries on with neutral sentiment.

use crate::config::FeedsConfig;
use crate::error::{AppError, Result};
use crate::utils::base_asset;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// One news item as scored by the sentiment analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsArticle {
    /// Title and description joined by a space
    pub fn text(&self) -> String {
        match &self.description {
            Some(description) => format!("{} {}", self.title, description),
            None => self.title.clone(),
        }
    }
}

#[async_trait]
pub trait NewsFeed: Send + Sync {
    /// Articles about `symbol`, oldest first; empty on any failure
    async fn recent_articles(&self, symbol: &str) -> Vec<NewsArticle>;
}

#[async_trait]
pub trait SocialFeed: Send + Sync {
    /// Post bodies about `symbol`, oldest first; empty on any failure
    async fn recent_posts(&self, symbol: &str) -> Vec<String>;
}

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

/// Keyword search over a NewsAPI-style `everything` endpoint
pub struct NewsApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    lookback_hours: i64,
}

impl NewsApiClient {
    pub fn new(config: &FeedsConfig, lookback_hours: i64, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: config.news_api_url.trim_end_matches('/').to_string(),
            api_key: config.news_api_key.clone().filter(|k| !k.is_empty()),
            lookback_hours,
        })
    }

    async fn fetch(&self, api_key: &str, symbol: &str) -> Result<Vec<NewsArticle>> {
        let to = Utc::now();
        let from = to - ChronoDuration::hours(self.lookback_hours);
        let url = format!("{}/everything", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", base_asset(symbol)),
                ("from", from.format("%Y-%m-%dT%H:%M:%S").to_string()),
                ("to", to.format("%Y-%m-%dT%H:%M:%S").to_string()),
                ("language", "en".to_string()),
                ("sortBy", "relevancy".to_string()),
            ])
            .header("X-Api-Key", api_key)
            .send()
            .await?
            .error_for_status()?;

        let body: NewsResponse = response.json().await?;
        Ok(order_articles(body.articles))
    }
}

/// Drop untitled items and order oldest first
fn order_articles(raw: Vec<RawArticle>) -> Vec<NewsArticle> {
    let mut articles: Vec<NewsArticle> = raw
        .into_iter()
        .filter_map(|a| {
            let title = a.title.filter(|t| !t.trim().is_empty())?;
            Some(NewsArticle {
                title,
                description: a.description.filter(|d| !d.trim().is_empty()),
                published_at: a.published_at,
            })
        })
        .collect();
    articles.sort_by_key(|a| a.published_at);
    articles
}

#[async_trait]
impl NewsFeed for NewsApiClient {
    async fn recent_articles(&self, symbol: &str) -> Vec<NewsArticle> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!(symbol = %symbol, "News feed disabled, no API key");
            return Vec::new();
        };

        match self.fetch(api_key, symbol).await {
            Ok(articles) => {
                debug!(symbol = %symbol, count = articles.len(), "Fetched news");
                articles
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "News fetch failed, continuing without news");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<RawPost>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    text: String,
}

/// Recent-post search over a Twitter-v2-style endpoint
pub struct SocialApiClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
    max_results: u32,
}

impl SocialApiClient {
    pub fn new(config: &FeedsConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: config.social_api_url.trim_end_matches('/').to_string(),
            bearer_token: config.social_bearer_token.clone().filter(|t| !t.is_empty()),
            // The search endpoint accepts 10..=100
            max_results: config.social_max_results.clamp(10, 100),
        })
    }

    async fn fetch(&self, token: &str, symbol: &str) -> Result<Vec<String>> {
        let url = format!("{}/tweets/search/recent", self.base_url);
        let query = format!("{} lang:en -is:retweet", base_asset(symbol));

        let response = self
            .client
            .get(&url)
            .query(&[("query", query), ("max_results", self.max_results.to_string())])
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        // Search returns newest first
        Ok(body.data.into_iter().rev().map(|p| p.text).collect())
    }
}

#[async_trait]
impl SocialFeed for SocialApiClient {
    async fn recent_posts(&self, symbol: &str) -> Vec<String> {
        let Some(token) = self.bearer_token.as_deref() else {
            debug!(symbol = %symbol, "Social feed disabled, no bearer token");
            return Vec::new();
        };

        match self.fetch(token, symbol).await {
            Ok(posts) => {
                debug!(symbol = %symbol, count = posts.len(), "Fetched social posts");
                posts
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Social fetch failed, continuing without posts");
                Vec::new()
            }
        }
    }
}
