use crate::cache::store::KeyValueStore;
use crate::cache::StoreCommand;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Drains queued writes into the durable store until every sender is gone.
pub fn spawn_store_writer(
    store: Arc<dyn KeyValueStore>,
    mut store_rx: mpsc::UnboundedReceiver<StoreCommand>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while let Some(command) = store_rx.blocking_recv() {
            match command {
                StoreCommand::Put { key, value } => {
                    if let Err(err) = store.write(&key, &value) {
                        warn!("Failed to persist {}: {:#}", key, err);
                    } else {
                        debug!("Persisted {} = {}", key, value);
                    }
                }
            }
        }
        debug!("Store writer stopped.");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;

    #[tokio::test]
    async fn applies_queued_writes_in_order() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = spawn_store_writer(store.clone(), rx);

        for value in ["T1", "T2"] {
            tx.send(StoreCommand::Put {
                key: "teamId_acme".into(),
                value: value.into(),
            })
            .unwrap();
        }
        drop(tx);
        writer.await.unwrap();

        assert_eq!(store.get("teamId_acme").as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn failed_write_does_not_stop_the_writer() {
        struct Failing;
        impl KeyValueStore for Failing {
            fn read_all(&self) -> anyhow::Result<std::collections::BTreeMap<String, String>> {
                Ok(Default::default())
            }
            fn write(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
                anyhow::bail!("disk full")
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = spawn_store_writer(Arc::new(Failing), rx);
        for _ in 0..2 {
            tx.send(StoreCommand::Put {
                key: "teamId_acme".into(),
                value: "T1".into(),
            })
            .unwrap();
        }
        drop(tx);
        writer.await.unwrap();
    }
}
