use crate::context::SharedContext;
use crate::error::Result;
use crate::server;
use crate::worker;

pub async fn run(ctx: SharedContext, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(ctx.config.server.port);
    println!("🚀 Starting cryptosignals server on port {}", port);
    println!(
        "⚡ Spawning analysis worker ({} symbols every {}s)...",
        ctx.config.symbols.len(),
        ctx.config.worker.analysis_interval_secs
    );

    let worker_ctx = ctx.clone();
    tokio::spawn(async move {
        worker::run_analysis_worker(worker_ctx).await;
    });

    server::serve(ctx, port).await
}
