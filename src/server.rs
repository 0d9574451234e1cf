use crate::cache::store::{KeyValueStore, YamlFileStore};
use crate::cache::writer::spawn_store_writer;
use crate::cache::TeamIdCache;
use crate::config::RedirectConfig;
use crate::server::listener::Dispatcher;
use crate::server::stdio::serve_lines;
use crate::server::watcher::spawn_store_watcher;
use crate::stats::{spawn_stats_collector, STATS_QUEUE_CAPACITY};
use log::{error, info};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::{mpsc, watch};

pub mod listener;
pub mod stdio;
pub mod watcher;

/// Runs the redirect host over stdin/stdout until the request stream ends or
/// a shutdown is signalled, then flushes pending store writes.
pub async fn spawn_redirect_host(
    config: &RedirectConfig,
    watch_store: bool,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let store: Arc<dyn KeyValueStore> = Arc::new(YamlFileStore::new(config.store_path()));
    info!("Using team id store {}", config.store_path().display());

    let (store_tx, store_rx) = mpsc::unbounded_channel();
    let writer_task = spawn_store_writer(store.clone(), store_rx);

    let cache = Arc::new(
        TeamIdCache::new(config.domain(), config.storage_key_prefix(), store_tx)
            .with_max_entries(config.max_cached_workspaces()),
    );

    // Not awaited: requests racing the restore just take the messages route.
    {
        let cache = cache.clone();
        let store = store.clone();
        tokio::task::spawn_blocking(move || cache.restore(store.as_ref()));
    }

    let watcher_task = if watch_store {
        Some(spawn_store_watcher(
            cache.clone(),
            store.clone(),
            config.store_path(),
            shutdown_rx.clone(),
        )?)
    } else {
        None
    };

    let (stats_tx, stats_rx) = mpsc::channel(STATS_QUEUE_CAPACITY);
    let stats_task = spawn_stats_collector(stats_rx);

    let dispatcher = Dispatcher::new(cache.clone(), stats_tx)?;
    let served = serve_lines(
        &dispatcher,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown_rx,
    )
    .await;

    if let Some(watcher_task) = watcher_task {
        if !watcher_task.is_finished() {
            watcher_task.abort();
        }
        let _ = watcher_task.await;
    }

    // Dropping the last cache handle closes the store queue.
    drop(dispatcher);
    drop(cache);
    if let Err(err) = writer_task.await {
        error!("Store writer ended with an error: {:?}", err);
    }
    if let Err(err) = stats_task.await {
        error!("Stats collector ended with an error: {:?}", err);
    }

    let answered = served?;
    info!("Answered {} request(s).", answered);

    Ok(())
}
