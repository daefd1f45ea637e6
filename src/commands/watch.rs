use crate::commands::render_outcome;
use crate::context::SharedContext;
use crate::error::Result;
use crate::worker;
use tokio::sync::mpsc;

pub async fn run(ctx: SharedContext) -> Result<()> {
    println!(
        "⏱️  Watching {} symbols every {}s (ctrl-c to stop)\n",
        ctx.config.symbols.len(),
        ctx.config.worker.analysis_interval_secs
    );

    let (tx, mut rx) = mpsc::channel(4);
    let worker_ctx = ctx.clone();
    let handle = tokio::spawn(async move {
        worker::run_analysis_worker_with_channel(worker_ctx, Some(tx)).await;
    });

    let mut reporter = ctx.reporter();
    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(outcomes) = received else { break };
                for outcome in &outcomes {
                    println!("{}", render_outcome(&ctx, &mut reporter, outcome).await);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n👋 Stopping");
                break;
            }
        }
    }

    handle.abort();
    Ok(())
}
