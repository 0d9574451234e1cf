use crate::cache::store::KeyValueStore;
use crate::cache::TeamIdCache;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Re-runs `restore` whenever the store file is created or modified on disk,
/// so mappings written by another instance show up without a restart.
pub fn spawn_store_watcher(
    cache: Arc<TeamIdCache>,
    store: Arc<dyn KeyValueStore>,
    store_path: &Path,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<JoinHandle<()>> {
    let file_name = store_path
        .file_name()
        .ok_or_else(|| anyhow!("Store path {} has no file name", store_path.display()))?
        .to_os_string();
    let watch_dir = match store_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&watch_dir)
        .with_context(|| format!("create dir: {}", watch_dir.display()))?;

    let (event_tx, mut event_rx) = mpsc::channel::<notify::Result<Event>>(16);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // Any single event triggers a full reload, so dropping extras is fine.
        let _ = event_tx.try_send(res);
    })?;
    // The store is replaced by rename, so watch its directory rather than the file.
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
    info!("Watching {} for store changes", watch_dir.display());

    Ok(tokio::spawn(async move {
        let _watcher = watcher;
        loop {
            tokio::select! {
                Some(res) = event_rx.recv() => match res {
                    Ok(event) if is_store_change(&event, &file_name) => {
                        debug!("Store changed ({:?}), reloading team ids", event.kind);
                        let cache = cache.clone();
                        let store = store.clone();
                        if let Err(err) =
                            tokio::task::spawn_blocking(move || cache.restore(store.as_ref())).await
                        {
                            error!("Team id reload failed: {:?}", err);
                        }
                    }
                    Ok(_) => {}
                    Err(err) => warn!("Store watch error: {}", err),
                },
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("Store watcher stopping.");
                        break;
                    }
                }
            }
        }
    }))
}

fn is_store_change(event: &Event, file_name: &std::ffi::OsStr) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::ffi::OsStr;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn only_creates_and_modifies_of_the_store_count() {
        let name = OsStr::new("team_ids.yaml");
        assert!(is_store_change(
            &event(EventKind::Create(CreateKind::File), "/state/team_ids.yaml"),
            name
        ));
        assert!(is_store_change(
            &event(EventKind::Modify(ModifyKind::Any), "/state/team_ids.yaml"),
            name
        ));
        assert!(!is_store_change(
            &event(EventKind::Remove(RemoveKind::File), "/state/team_ids.yaml"),
            name
        ));
        assert!(!is_store_change(
            &event(EventKind::Modify(ModifyKind::Any), "/state/team_ids.yaml.tmp"),
            name
        ));
    }
}
