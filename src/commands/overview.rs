use crate::context::SharedContext;
use crate::error::Result;
use crate::services::report::currency_symbol;
use crate::utils::{base_asset, format_price};

pub async fn run(ctx: SharedContext) -> Result<()> {
    let currency = &ctx.config.data.display_currency;
    let symbol = currency_symbol(currency);
    let states = ctx.market_states.overview(&ctx.config.symbols).await;

    println!("📊 Market Overview\n");
    println!("{:<8} {:>14} {:<9} {:>4}  {}", "Asset", "Price", "Outlook", "MSI", "Pattern");
    println!("═══════════════════════════════════════════════════════════");
    for state in &states {
        let price = if state.price > 0.0 {
            format!("{}{}", symbol, format_price(ctx.prices.to_display_currency(state.price).await))
        } else {
            "n/a".to_string()
        };
        let marker = if state.is_degraded() { " *" } else { "" };
        println!(
            "{:<8} {:>14} {:<9} {:>4}  {}{}",
            base_asset(&state.symbol),
            price,
            state.direction.as_str(),
            state.msi_value,
            state.pattern,
            marker
        );
    }

    if states.iter().any(|s| s.is_degraded()) {
        println!("\n* approximate: live market data unavailable");
    }
    Ok(())
}
