use crate::context::SharedContext;
use crate::error::Result;
use crate::services::report::currency_symbol;
use crate::utils::{format_price, pair_symbol};

pub async fn run(ctx: SharedContext, symbol: &str) -> Result<()> {
    let pair = pair_symbol(symbol);
    let price = ctx.prices.get_current_price(&pair).await?;
    let display = ctx.prices.to_display_currency(price).await;
    let data = ctx.prices.config();

    println!("💰 {}", pair);
    println!("   {}: {}", data.quote_currency, format_price(price));
    println!(
        "   {}: {}{}",
        data.display_currency,
        currency_symbol(&data.display_currency),
        format_price(display)
    );
    Ok(())
}
