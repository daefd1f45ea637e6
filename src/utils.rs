use crate::constants::{COIN_IDS, QUOTE_ASSET};

/// Normalise a ticker to its trading pair (`btc` → `BTCUSDT`)
///
/// Symbols already quoted in the quote asset are returned upper-cased.
pub fn pair_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    if upper.ends_with(QUOTE_ASSET) && upper.len() > QUOTE_ASSET.len() {
        upper
    } else {
        format!("{}{}", upper, QUOTE_ASSET)
    }
}

/// Base asset of a pair (`BTCUSDT` → `BTC`)
pub fn base_asset(symbol: &str) -> String {
    let pair = pair_symbol(symbol);
    pair[..pair.len() - QUOTE_ASSET.len()].to_string()
}

/// CoinGecko coin id for a symbol, falling back to the lower-cased base asset
pub fn coin_id(symbol: &str) -> String {
    let pair = pair_symbol(symbol);
    COIN_IDS
        .iter()
        .find(|(p, _)| *p == pair)
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| base_asset(&pair).to_lowercase())
}

/// Install the global `fmt` subscriber
///
/// Honours `RUST_LOG`, defaulting to `info`. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}

/// Format a price with precision suited to its magnitude
pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format!("{:.2}", price)
    } else {
        format!("{:.6}", price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_symbol() {
        assert_eq!(pair_symbol("btc"), "BTCUSDT");
        assert_eq!(pair_symbol("BTCUSDT"), "BTCUSDT");
        assert_eq!(pair_symbol(" eth "), "ETHUSDT");
        assert_eq!(pair_symbol("USDT"), "USDTUSDT");
    }

    #[test]
    fn test_base_asset() {
        assert_eq!(base_asset("HBARUSDT"), "HBAR");
        assert_eq!(base_asset("xrp"), "XRP");
    }

    #[test]
    fn test_coin_id_lookup_and_fallback() {
        assert_eq!(coin_id("BTC"), "bitcoin");
        assert_eq!(coin_id("MATICUSDT"), "matic-network");
        assert_eq!(coin_id("LINK"), "link");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(43250.5), "43250.50");
        assert_eq!(format_price(0.061234), "0.061234");
    }
}
