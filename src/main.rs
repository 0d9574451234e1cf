use anyhow::Result;
use archive_redirect::cli::Cli;
use archive_redirect::config::load_config;
use archive_redirect::server::spawn_redirect_host;
use clap::Parser;
use log::{error, info};
use tokio::signal;
use tokio::sync::watch;

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the responses.
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli));
    // A pending stdin read holds a blocking thread; don't wait for it.
    runtime.shutdown_background();

    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config = config.with_store_path(store);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let shutdown_task = tokio::spawn(handle_shutdown_signal(shutdown_tx));

    spawn_redirect_host(&config, cli.watch_store, shutdown_rx).await?;

    shutdown_task.abort();
    info!("Archive redirect host stopped.");

    Ok(())
}

pub async fn handle_shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    // Wait for a shutdown signal (e.g., Ctrl+C)
    if let Err(err) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        // Keep the sender alive so the request loop runs until EOF.
        std::future::pending::<()>().await;
    }

    // Send the shutdown notification to all receivers
    let _ = shutdown_tx.send(true);
}
