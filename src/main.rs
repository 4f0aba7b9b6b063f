use tideway::config::Config;
use tideway::server;

fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(cfg.server.log_level())
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.server.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(serve_until_shutdown(&cfg))
}

async fn serve_until_shutdown(cfg: &Config) -> anyhow::Result<()> {
    tokio::select! {
        res = server::listener::run(cfg) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
