//! Human-readable signal and market-state reports
//!
//! `Simple` wording explains the outcome in plain language; `Advanced`
//! shows the raw indicator values. Headlines are picked from equivalent
//! phrasings with an injected RNG, so a fixed seed gives fixed output.

use crate::config::{ReportConfig, ReportStyle, SentimentConfig};
use crate::models::{Direction, MarketState, Recommendation, Signal, SymbolOutcome};
use crate::utils::{base_asset, format_price};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt::Write;

const BUY_HEADLINES: &[&str] = &[
    "Conditions look favourable for buying",
    "Indicators and sentiment line up for a buy",
    "A buying opportunity may be forming",
];

const HOLD_HEADLINES: &[&str] = &[
    "No clear buying opportunity right now",
    "Better to wait for a stronger setup",
    "Signals are mixed, holding is the safer call",
];

const BULLISH_LINES: &[&str] = &[
    "Buyers are in control at the moment",
    "Momentum is pointing upwards",
];

const BEARISH_LINES: &[&str] = &[
    "Sellers have the upper hand at the moment",
    "Momentum is pointing downwards",
];

const NEUTRAL_LINES: &[&str] = &[
    "The market is moving sideways",
    "Neither buyers nor sellers are in control",
];

/// Symbol used in front of amounts in `currency`
pub fn currency_symbol(currency: &str) -> String {
    match currency.to_uppercase().as_str() {
        "GBP" => "£".to_string(),
        "USD" | "USDT" => "$".to_string(),
        "EUR" => "€".to_string(),
        other => format!("{} ", other),
    }
}

pub struct Reporter {
    style: ReportStyle,
    positive_threshold: f64,
    rng: StdRng,
}

impl Reporter {
    pub fn new(config: &ReportConfig, sentiment: &SentimentConfig) -> Self {
        let rng = match config.phrasing_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            style: config.style,
            positive_threshold: sentiment.positive_threshold,
            rng,
        }
    }

    pub fn style(&self) -> ReportStyle {
        self.style
    }

    fn pick(&mut self, options: &[&'static str]) -> &'static str {
        options.choose(&mut self.rng).copied().unwrap_or_default()
    }

    /// Signal message with the price shown in the display currency
    ///
    /// # Arguments
    /// * `signal` - Signal to describe
    /// * `display_price` - `signal.current_price` converted to `currency`
    /// * `currency` - Display currency code (e.g. "GBP")
    pub fn format_signal_message(&mut self, signal: &Signal, display_price: f64, currency: &str) -> String {
        let headline = match signal.recommendation {
            Recommendation::Buy => self.pick(BUY_HEADLINES),
            Recommendation::Hold => self.pick(HOLD_HEADLINES),
        };
        let symbol = currency_symbol(currency);
        let ind = &signal.technical.indicators;
        let mut out = String::new();

        let _ = writeln!(out, "Trading Signal for {}", signal.symbol);
        let _ = writeln!(out, "Time: {}", signal.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "Current Price: {}{}", symbol, format_price(display_price));
        let _ = writeln!(out, "Recommendation: {} ({})", signal.recommendation, headline);
        let _ = writeln!(out, "Confidence: {:.1}%", signal.confidence * 100.0);
        let _ = writeln!(out);

        match self.style {
            ReportStyle::Simple => {
                let _ = writeln!(out, "What the chart says:");
                let _ = writeln!(out, "- {}", describe_rsi(ind.rsi));
                let _ = writeln!(
                    out,
                    "- {}",
                    if ind.macd > ind.macd_signal {
                        "Short-term trend is turning up"
                    } else if ind.macd < ind.macd_signal {
                        "Short-term trend is turning down"
                    } else {
                        "Short-term trend is flat"
                    }
                );
                let _ = writeln!(out, "- {}", describe_band(ind.bb_position));
                let _ = writeln!(out);
                let _ = writeln!(out, "What people are saying:");
                let _ = writeln!(
                    out,
                    "- {}",
                    describe_sentiment(signal.sentiment.confidence, self.positive_threshold)
                );
            }
            ReportStyle::Advanced => {
                let _ = writeln!(out, "Technical Analysis:");
                let _ = writeln!(out, "- RSI: {:.1}", ind.rsi);
                let _ = writeln!(out, "- MACD: {:.4} (signal {:.4}, histogram {:.4})", ind.macd, ind.macd_signal, ind.macd_histogram);
                let _ = writeln!(
                    out,
                    "- Bollinger: {:.2} / {:.2} / {:.2} (position {:.2})",
                    ind.bb_lower, ind.bb_middle, ind.bb_upper, ind.bb_position
                );
                let _ = writeln!(out, "- Score: {:+.2} (confidence {:.1}%)", signal.technical.signal, signal.technical.confidence * 100.0);
                let _ = writeln!(out);
                let _ = writeln!(out, "Sentiment Analysis:");
                let _ = writeln!(out, "- News Sentiment: {:.1}%", signal.sentiment.components.news * 100.0);
                let _ = writeln!(out, "- Social Sentiment: {:.1}%", signal.sentiment.components.social * 100.0);
            }
        }

        out
    }

    /// One-line notice for a symbol that could not be analysed
    pub fn format_outcome(&mut self, outcome: &SymbolOutcome, display_price: f64, currency: &str) -> String {
        match outcome {
            SymbolOutcome::Available(signal) => self.format_signal_message(signal, display_price, currency),
            SymbolOutcome::Unavailable { symbol, reason } => {
                format!("{}: analysis not available ({})\n", symbol, reason)
            }
        }
    }

    /// Market state summary with pattern targets in the display currency
    ///
    /// # Arguments
    /// * `state` - Cached state to describe
    /// * `display_price` - `state.price` converted to `currency`
    /// * `currency` - Display currency code
    pub fn format_market_state(&mut self, state: &MarketState, display_price: f64, currency: &str) -> String {
        let symbol = currency_symbol(currency);
        let mood = match state.direction {
            Direction::Bullish => self.pick(BULLISH_LINES),
            Direction::Bearish => self.pick(BEARISH_LINES),
            Direction::Neutral => self.pick(NEUTRAL_LINES),
        };
        let targets: Vec<String> = state
            .pattern
            .targets(display_price)
            .iter()
            .map(|t| format!("{}{}", symbol, format_price(*t)))
            .collect();

        let mut out = String::new();
        let _ = writeln!(out, "{} Market State", base_asset(&state.symbol));
        if state.price > 0.0 {
            let _ = writeln!(out, "Price: {}{}", symbol, format_price(display_price));
        } else {
            let _ = writeln!(out, "Price: not available");
        }
        let _ = writeln!(out, "Outlook: {} ({})", state.direction, mood);
        let _ = writeln!(out, "Market Sentiment Index: {}/100", state.msi_value);

        match self.style {
            ReportStyle::Simple => {
                let _ = writeln!(out, "Pattern: {}", state.pattern.description());
                let _ = writeln!(
                    out,
                    "This works about {}% of the time. Target: {}",
                    state.pattern.success_rate(),
                    targets.join(" (up) or ")
                );
            }
            ReportStyle::Advanced => {
                let _ = writeln!(
                    out,
                    "Pattern: {} (bias {}, success rate {}%)",
                    state.pattern,
                    state.pattern.bias(),
                    state.pattern.success_rate()
                );
                let _ = writeln!(out, "Targets: {}", targets.join(", "));
                let _ = writeln!(
                    out,
                    "24h change: {:+.2}% | volume trend: {:+.2}",
                    state.price_change_24h * 100.0,
                    state.volume_change
                );
            }
        }
        if state.is_degraded() {
            let _ = writeln!(out, "Note: live market data was incomplete for this update");
        }
        let _ = writeln!(out, "Updated: {}", state.updated_at.format("%H:%M UTC"));
        out
    }
}

fn describe_rsi(rsi: f64) -> &'static str {
    if rsi > 70.0 {
        "Price has risen fast and may be overbought"
    } else if rsi < 30.0 {
        "Price has fallen fast and may be oversold"
    } else {
        "Buying and selling pressure look balanced"
    }
}

fn describe_band(position: f64) -> &'static str {
    if position > 1.0 {
        "Price is above its usual range"
    } else if position < 0.0 {
        "Price is below its usual range"
    } else if position >= 0.5 {
        "Price is in the upper half of its usual range"
    } else {
        "Price is in the lower half of its usual range"
    }
}

fn describe_sentiment(score: f64, positive_threshold: f64) -> &'static str {
    if score >= positive_threshold {
        "News and social posts are mostly positive"
    } else if score <= 1.0 - positive_threshold {
        "News and social posts are mostly negative"
    } else {
        "News and social posts are mixed or quiet"
    }
}
