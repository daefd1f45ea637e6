pub mod analyze;
pub mod overview;
pub mod price;
pub mod serve;
pub mod state;
pub mod watch;

use crate::context::AppContext;
use crate::models::SymbolOutcome;
use crate::services::Reporter;

/// Render one outcome, converting the signal price to the display currency
pub(crate) async fn render_outcome(ctx: &AppContext, reporter: &mut Reporter, outcome: &SymbolOutcome) -> String {
    let display_price = match outcome.signal() {
        Some(signal) => ctx.prices.to_display_currency(signal.current_price).await,
        None => 0.0,
    };
    reporter.format_outcome(outcome, display_price, &ctx.config.data.display_currency)
}
