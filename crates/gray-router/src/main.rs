use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use gray_router::admin::AdminServer;
use gray_router::cli::Args;
use gray_router::config::Config;
use gray_router::logging::init_logger;
use gray_router::proxy::RouterServer;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.log_format)?;

    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    config.apply_overrides(&args.overrides());
    config.validate()?;

    let workers = config.listen.worker_threads();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()?;

    info!(
        "Starting gray-router {} with {} worker threads",
        env!("CARGO_PKG_VERSION"),
        workers
    );

    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    if config.metrics.enabled {
        let addr = SocketAddr::new(config.listen.address, config.metrics.port);
        let admin = AdminServer::bind(addr).await?;
        tokio::spawn(async move {
            if let Err(e) = admin.run().await {
                error!("Admin server failed: {}", e);
            }
        });
    }

    let server = RouterServer::new(config)?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
