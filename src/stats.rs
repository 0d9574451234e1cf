use crate::navigation::Strategy;
use log::info;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const STATS_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
pub struct DecisionStats {
    // Aggregate stats per workspace
    per_workspace: HashMap<String, WorkspaceStats>,
    passed_through: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkspaceStats {
    pub direct_redirects: u64,
    pub messages_redirects: u64,
    pub team_ids_learned: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionMessage {
    Redirected {
        workspace: String,
        strategy: Strategy,
    },
    PassedThrough,
    TeamIdLearned {
        workspace: String,
    },
}

impl DecisionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a message to update the stats
    pub fn handle_message(&mut self, message: DecisionMessage) {
        match message {
            DecisionMessage::Redirected {
                workspace,
                strategy,
            } => {
                let entry = self.per_workspace.entry(workspace).or_default();
                match strategy {
                    Strategy::Direct => entry.direct_redirects += 1,
                    Strategy::Messages => entry.messages_redirects += 1,
                }
            }
            DecisionMessage::PassedThrough => self.passed_through += 1,
            DecisionMessage::TeamIdLearned { workspace } => {
                self.per_workspace.entry(workspace).or_default().team_ids_learned += 1;
            }
        }
    }

    pub fn workspace(&self, workspace: &str) -> Option<&WorkspaceStats> {
        self.per_workspace.get(workspace)
    }

    pub fn passed_through(&self) -> u64 {
        self.passed_through
    }

    /// Display statistics
    pub fn print_stats(&self) {
        for (workspace, stats) in &self.per_workspace {
            info!(
                "Workspace: {} | Direct: {} | Messages: {} | Team IDs learned: {}",
                workspace,
                stats.direct_redirects,
                stats.messages_redirects,
                stats.team_ids_learned
            );
        }
        info!("Passed through: {}", self.passed_through);
    }
}

/// Collects decision messages until all senders are dropped, then logs a summary.
pub fn spawn_stats_collector(mut stats_rx: mpsc::Receiver<DecisionMessage>) -> JoinHandle<DecisionStats> {
    tokio::spawn(async move {
        let mut stats = DecisionStats::new();
        while let Some(message) = stats_rx.recv().await {
            stats.handle_message(message);
        }
        stats.print_stats();
        stats
    })
}
