use crate::cache::store::KeyValueStore;
use crate::redirect::domain::FamilyDomain;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::mpsc;
use url::Url;

const CLIENT_SEGMENT: &str = "client";

/// Durable write requested by the cache. Nobody waits for it to land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    Put { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnOutcome {
    Learned { workspace: String, team_id: String },
    NotLearned(NotLearned),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotLearned {
    /// Target is not `<canonical>/client/{teamId}/...`, or does not parse.
    NotClientPath,
    MissingOrigin,
    UnparseableOrigin,
    /// Origin page is not on a workspace host of the family.
    ForeignOrigin,
    /// New workspace refused because `max_cached_workspaces` is reached.
    CacheFull,
}

/// Workspace name -> team id, kept in memory for synchronous lookups and
/// mirrored to durable storage through a [`StoreCommand`] channel.
pub struct TeamIdCache {
    domain: FamilyDomain,
    key_prefix: String,
    max_entries: Option<usize>,
    entries: RwLock<HashMap<String, String>>,
    store_tx: mpsc::UnboundedSender<StoreCommand>,
}

impl TeamIdCache {
    pub fn new(
        domain: FamilyDomain,
        key_prefix: impl Into<String>,
        store_tx: mpsc::UnboundedSender<StoreCommand>,
    ) -> Self {
        Self {
            domain,
            key_prefix: key_prefix.into(),
            max_entries: None,
            entries: RwLock::new(HashMap::new()),
            store_tx,
        }
    }

    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn domain(&self) -> &FamilyDomain {
        &self.domain
    }

    pub fn storage_key(&self, workspace: &str) -> String {
        format!("{}{}", self.key_prefix, workspace)
    }

    /// Rebuilds the in-memory mapping from every durable entry under the key
    /// prefix. A store that cannot be read counts as empty.
    pub fn restore(&self, store: &dyn KeyValueStore) -> usize {
        let items = match store.read_all() {
            Ok(items) => items,
            Err(err) => {
                warn!("Failed to read team id store, starting empty: {:#}", err);
                return 0;
            }
        };

        let mut restored = 0;
        for (key, team_id) in items {
            let Some(workspace) = key.strip_prefix(self.key_prefix.as_str()) else {
                continue;
            };
            if workspace.is_empty() || team_id.is_empty() {
                continue;
            }
            if self.insert(workspace, &team_id) {
                restored += 1;
            }
        }

        info!("Loaded {} team id(s) from storage", restored);
        restored
    }

    /// Learns `workspace -> teamId` from a navigation to the client path,
    /// taking the workspace from the page that started the navigation.
    pub fn observe(&self, target: &str, origin: Option<&str>) -> LearnOutcome {
        let Some(team_id) = self.client_team_id(target) else {
            return LearnOutcome::NotLearned(NotLearned::NotClientPath);
        };

        let Some(origin) = origin else {
            debug!("No origin for {}, cannot map team id {}", target, team_id);
            return LearnOutcome::NotLearned(NotLearned::MissingOrigin);
        };

        let Ok(origin_url) = Url::parse(origin) else {
            debug!("Unparseable origin {} for {}", origin, target);
            return LearnOutcome::NotLearned(NotLearned::UnparseableOrigin);
        };

        let Some(workspace) = origin_url
            .host_str()
            .and_then(|host| self.domain.workspace_of(host))
        else {
            debug!("Origin {} is outside {}", origin, self.domain.family());
            return LearnOutcome::NotLearned(NotLearned::ForeignOrigin);
        };

        if !self.insert(workspace, &team_id) {
            warn!(
                "Team id cache is full, not learning {} for workspace {}",
                team_id, workspace
            );
            return LearnOutcome::NotLearned(NotLearned::CacheFull);
        }

        // Only fails once the writer is gone.
        if let Err(err) = self.store_tx.send(StoreCommand::Put {
            key: self.storage_key(workspace),
            value: team_id.clone(),
        }) {
            warn!("Failed to queue team id write, store writer stopped: {}", err);
        }

        info!("Detected team ID {} for workspace {}", team_id, workspace);
        LearnOutcome::Learned {
            workspace: workspace.to_string(),
            team_id,
        }
    }

    /// Memory-only read, safe to call from the blocking decision path.
    pub fn lookup(&self, workspace: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(workspace)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, workspace: &str, team_id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(max) = self.max_entries {
            if entries.len() >= max && !entries.contains_key(workspace) {
                return false;
            }
        }
        entries.insert(workspace.to_string(), team_id.to_string());
        true
    }

    fn client_team_id(&self, target: &str) -> Option<String> {
        let url = Url::parse(target).ok()?;
        if !self.domain.is_canonical(url.host_str()?) {
            return None;
        }
        if !url.path().starts_with("/client/") {
            return None;
        }

        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        if segments.next()? != CLIENT_SEGMENT {
            return None;
        }
        segments.next().map(str::to_string)
    }
}
