use crate::context::SharedContext;
use crate::models::SymbolOutcome;
use chrono::Utc;
use tokio::sync::mpsc::Sender;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

#[instrument(skip(ctx))]
pub async fn run(ctx: SharedContext) {
    run_with_channel(ctx, None).await;
}

/// Re-run the analysis pass forever, forwarding each pass's outcomes to `tx`
#[instrument(skip(ctx, tx))]
pub async fn run_with_channel(ctx: SharedContext, tx: Option<Sender<Vec<SymbolOutcome>>>) {
    let interval = ctx.config.worker.analysis_interval();
    info!(
        interval_secs = interval.as_secs(),
        symbols = ?ctx.config.symbols,
        "Starting analysis worker"
    );

    let mut iteration_count = 0u64;
    loop {
        iteration_count += 1;
        let outcomes = run_once(&ctx, iteration_count).await;

        if let Some(tx) = &tx {
            if tx.send(outcomes).await.is_err() {
                warn!(iteration = iteration_count, "Outcome receiver closed, stopping analysis worker");
                return;
            }
        }

        info!(
            iteration = iteration_count,
            next_in_secs = interval.as_secs(),
            "Analysis worker: sleeping"
        );
        sleep(interval).await;
    }
}

/// One pass over the configured symbols; publishes results and health
pub async fn run_once(ctx: &SharedContext, iteration: u64) -> Vec<SymbolOutcome> {
    let loop_start = std::time::Instant::now();
    info!(iteration, "Analysis worker: starting pass");

    let outcomes = ctx.pipeline.run_analysis(&ctx.config.symbols).await;
    ctx.publish(&outcomes).await;

    let available = outcomes.iter().filter(|o| o.signal().is_some()).count();
    let elapsed = loop_start.elapsed();
    {
        let mut health = ctx.health.write().await;
        health.iteration_count = iteration;
        health.last_pass = Some(Utc::now());
        health.last_pass_secs = Some(elapsed.as_secs_f64());
        health.available = available;
        health.unavailable = outcomes.len() - available;
    }

    info!(
        iteration,
        available,
        unavailable = outcomes.len() - available,
        duration_secs = elapsed.as_secs_f64(),
        "Analysis worker: pass completed"
    );
    outcomes
}
