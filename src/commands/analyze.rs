use crate::commands::render_outcome;
use crate::context::SharedContext;
use crate::error::Result;

pub async fn run(ctx: SharedContext, symbols: Option<Vec<String>>) -> Result<()> {
    let symbols = symbols.unwrap_or_else(|| ctx.config.symbols.clone());
    println!("🔍 Analysing {} symbols...\n", symbols.len());

    let outcomes = ctx.pipeline.run_analysis(&symbols).await;
    let mut reporter = ctx.reporter();
    for outcome in &outcomes {
        println!("{}", render_outcome(&ctx, &mut reporter, outcome).await);
    }

    let available = outcomes.iter().filter(|o| o.signal().is_some()).count();
    println!("✅ {} of {} symbols analysed", available, outcomes.len());
    Ok(())
}
