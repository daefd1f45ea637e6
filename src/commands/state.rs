use crate::context::SharedContext;
use crate::error::Result;

pub async fn run(ctx: SharedContext, symbol: &str) -> Result<()> {
    let state = ctx.market_states.get_state(symbol).await;
    let display = ctx.prices.to_display_currency(state.price).await;
    let mut reporter = ctx.reporter();

    println!("{}", reporter.format_market_state(&state, display, &ctx.config.data.display_currency));
    if state.is_degraded() {
        println!("⚠️  Live market data unavailable ({:?}), values are approximate", state.source);
    }
    Ok(())
}
