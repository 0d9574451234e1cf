use crate::cache::{LearnOutcome, TeamIdCache};
use crate::navigation::{NavigationRequest, ResourceKind, RewriteDecision};
use crate::redirect::pattern::MatchPattern;
use crate::redirect::RedirectEngine;
use crate::stats::DecisionMessage;
use anyhow::Result;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// A request subscription: URL pattern plus the resource kinds it receives.
#[derive(Debug, Clone)]
pub struct Listener {
    pattern: MatchPattern,
    kinds: Vec<ResourceKind>,
}

impl Listener {
    pub fn new(pattern: &str, kinds: &[ResourceKind]) -> Result<Self> {
        Ok(Listener {
            pattern: MatchPattern::parse(pattern)?,
            kinds: kinds.to_vec(),
        })
    }

    pub fn accepts(&self, kind: ResourceKind, url: &Url) -> bool {
        self.kinds.contains(&kind) && self.pattern.matches(url)
    }

    pub fn pattern(&self) -> &MatchPattern {
        &self.pattern
    }
}

/// Feeds each request to the archive listener (may redirect) and the client
/// listener (only learns team ids). The two never coordinate.
pub struct Dispatcher {
    archive: Listener,
    client: Listener,
    engine: RedirectEngine,
    cache: Arc<TeamIdCache>,
    stats_tx: mpsc::Sender<DecisionMessage>,
}

impl Dispatcher {
    pub fn new(cache: Arc<TeamIdCache>, stats_tx: mpsc::Sender<DecisionMessage>) -> Result<Self> {
        let domain = cache.domain();
        let archive = Listener::new(
            &format!("*://*.{}/archives/*", domain.family()),
            &[ResourceKind::MainFrame, ResourceKind::SubFrame],
        )?;
        let client = Listener::new(
            &format!("*://{}/client/*", domain.canonical_host()),
            &[ResourceKind::MainFrame],
        )?;
        debug!(
            "Listening for {} and {}",
            archive.pattern(),
            client.pattern()
        );

        Ok(Dispatcher {
            archive,
            client,
            engine: RedirectEngine::new(cache.clone()),
            cache,
            stats_tx,
        })
    }

    pub fn dispatch(&self, request: &NavigationRequest) -> RewriteDecision {
        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(err) => {
                // Neither subscription can match a URL that does not parse.
                debug!("Ignoring unparseable URL {}: {}", request.url, err);
                let decision = RewriteDecision::PassThrough;
                self.report(&decision);
                return decision;
            }
        };

        let decision = if self.archive.accepts(request.kind, &url) {
            self.engine.decide(request)
        } else {
            RewriteDecision::PassThrough
        };

        if self.client.accepts(request.kind, &url) {
            if let LearnOutcome::Learned { workspace, .. } =
                self.cache.observe(&request.url, request.origin_url.as_deref())
            {
                self.send_stats(DecisionMessage::TeamIdLearned { workspace });
            }
        }

        self.report(&decision);
        decision
    }

    fn report(&self, decision: &RewriteDecision) {
        let message = match decision {
            RewriteDecision::PassThrough => DecisionMessage::PassedThrough,
            RewriteDecision::Redirect {
                workspace,
                strategy,
                ..
            } => DecisionMessage::Redirected {
                workspace: workspace.clone(),
                strategy: *strategy,
            },
        };
        self.send_stats(message);
    }

    fn send_stats(&self, message: DecisionMessage) {
        if let Err(err) = self.stats_tx.try_send(message) {
            warn!("Failed to send decision stats: {}", err);
        }
    }
}
