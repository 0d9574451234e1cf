use crate::cache::TeamIdCache;
use crate::navigation::{NavigationRequest, RewriteDecision, Strategy};
use log::{error, info};
use std::sync::Arc;
use url::Url;

const ARCHIVE_SEGMENT: &str = "archives";
const MESSAGES_SEGMENT: &str = "messages";
const CLIENT_SEGMENT: &str = "client";

/// Decides, per request and without retained state, whether an archive
/// permalink gets rewritten and to what.
#[derive(Clone)]
pub struct RedirectEngine {
    cache: Arc<TeamIdCache>,
}

/// Pieces of `/{archives}/{channel}[/{third}]` on a workspace host.
#[derive(Debug, PartialEq, Eq)]
struct ArchivePath<'a> {
    workspace: &'a str,
    channel: &'a str,
    third: Option<&'a str>,
}

impl RedirectEngine {
    pub fn new(cache: Arc<TeamIdCache>) -> Self {
        RedirectEngine { cache }
    }

    pub fn decide(&self, request: &NavigationRequest) -> RewriteDecision {
        if !request.kind.is_navigation() {
            return RewriteDecision::PassThrough;
        }

        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(err) => {
                error!("Error in archive redirect for {}: {}", request.url, err);
                return RewriteDecision::PassThrough;
            }
        };

        self.rewrite(&url).unwrap_or(RewriteDecision::PassThrough)
    }

    fn rewrite(&self, url: &Url) -> Option<RewriteDecision> {
        let archive = self.match_archive(url)?;

        let team_id = self
            .cache
            .lookup(archive.workspace)
            .filter(|team_id| !matches!(team_id.as_str(), "" | "." | ".."));

        if let Some(team_id) = team_id {
            let direct = self.direct_url(url, &team_id, archive.channel)?;
            info!("Redirect (direct): {} -> {}", url, direct);
            return Some(RewriteDecision::Redirect {
                url: direct,
                workspace: archive.workspace.to_string(),
                strategy: Strategy::Direct,
            });
        }

        let mut path = format!("/{}/{}", MESSAGES_SEGMENT, archive.channel);
        if let Some(third) = archive.third {
            path.push('/');
            path.push_str(third);
        }

        // Query and fragment ride along untouched.
        let mut messages = url.clone();
        messages.set_path(&path);
        info!("Redirect (messages): {} -> {}", url, messages);
        Some(RewriteDecision::Redirect {
            url: messages,
            workspace: archive.workspace.to_string(),
            strategy: Strategy::Messages,
        })
    }

    /// `scheme://{canonical}/client/{teamId}/{channel}`. The team id is
    /// encoded as one segment; the channel is already encoded in `url`.
    fn direct_url(&self, url: &Url, team_id: &str, channel: &str) -> Option<Url> {
        let mut direct = Url::parse(&format!(
            "{}://{}/",
            url.scheme(),
            self.cache.domain().canonical_host()
        ))
        .ok()?;
        direct
            .path_segments_mut()
            .ok()?
            .clear()
            .push(CLIENT_SEGMENT)
            .push(team_id);
        let path = format!("{}/{}", direct.path(), channel);
        direct.set_path(&path);
        Some(direct)
    }

    fn match_archive<'a>(&self, url: &'a Url) -> Option<ArchivePath<'a>> {
        if !url.path().starts_with("/archives/") {
            return None;
        }

        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        if segments.next()? != ARCHIVE_SEGMENT {
            return None;
        }
        let channel = segments.next()?;
        let third = segments.next();

        let workspace = self.cache.domain().workspace_of(url.host_str()?)?;

        Some(ArchivePath {
            workspace,
            channel,
            third,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use crate::navigation::ResourceKind;
    use crate::redirect::domain::FamilyDomain;
    use tokio::sync::mpsc;

    fn engine() -> (RedirectEngine, Arc<TeamIdCache>) {
        let (tx, _rx) = mpsc::unbounded_channel();
        let cache = Arc::new(TeamIdCache::new(
            FamilyDomain::new("slack.com", "app"),
            "teamId_",
            tx,
        ));
        (RedirectEngine::new(cache.clone()), cache)
    }

    fn redirect_of(engine: &RedirectEngine, url: &str) -> Option<String> {
        engine
            .decide(&NavigationRequest::new(url, ResourceKind::MainFrame))
            .redirect_url()
            .map(Url::to_string)
    }

    #[test]
    fn unknown_workspace_uses_messages_path() {
        let (engine, _) = engine();
        assert_eq!(
            redirect_of(
                &engine,
                "https://acme.slack.com/archives/C123/p1690000000000000?x=1#y"
            )
            .as_deref(),
            Some("https://acme.slack.com/messages/C123/p1690000000000000?x=1#y")
        );
    }

    #[test]
    fn messages_path_without_timestamp() {
        let (engine, _) = engine();
        assert_eq!(
            redirect_of(&engine, "http://acme.slack.com/archives/C123").as_deref(),
            Some("http://acme.slack.com/messages/C123")
        );
        assert_eq!(
            redirect_of(&engine, "https://acme.slack.com/archives/C123/?thread_ts=1.2").as_deref(),
            Some("https://acme.slack.com/messages/C123?thread_ts=1.2")
        );
    }

    #[test]
    fn only_third_segment_is_carried() {
        let (engine, _) = engine();
        assert_eq!(
            redirect_of(&engine, "https://acme.slack.com/archives/C123/p1/extra").as_deref(),
            Some("https://acme.slack.com/messages/C123/p1")
        );
    }

    #[test]
    fn known_workspace_goes_direct() {
        let (engine, cache) = engine();
        cache.observe(
            "https://app.slack.com/client/T99/C1",
            Some("https://acme.slack.com/"),
        );

        let decision = engine.decide(&NavigationRequest::new(
            "https://acme.slack.com/archives/C123/p1690000000000000?x=1#y",
            ResourceKind::SubFrame,
        ));
        assert_eq!(
            decision,
            RewriteDecision::Redirect {
                url: Url::parse("https://app.slack.com/client/T99/C123").unwrap(),
                workspace: "acme".into(),
                strategy: Strategy::Direct,
            }
        );
    }

    #[test]
    fn restored_entry_goes_direct() {
        let (engine, cache) = engine();
        cache.restore(&MemoryStore::with_entries([("teamId_acme", "T5")]));
        assert_eq!(
            redirect_of(&engine, "https://acme.slack.com/archives/C9").as_deref(),
            Some("https://app.slack.com/client/T5/C9")
        );
        assert_eq!(
            redirect_of(&engine, "https://globex.slack.com/archives/C9").as_deref(),
            Some("https://globex.slack.com/messages/C9")
        );
    }

    #[test]
    fn stored_team_id_stays_one_segment() {
        let (engine, cache) = engine();
        cache.restore(&MemoryStore::with_entries([
            ("teamId_acme", "T?9#x/y"),
            ("teamId_globex", ".."),
        ]));
        assert_eq!(
            redirect_of(&engine, "https://acme.slack.com/archives/C9?x=1#y").as_deref(),
            Some("https://app.slack.com/client/T%3F9%23x%2Fy/C9")
        );
        assert_eq!(
            redirect_of(&engine, "https://globex.slack.com/archives/C9").as_deref(),
            Some("https://globex.slack.com/messages/C9")
        );
    }

    #[test]
    fn encoded_channel_is_not_encoded_twice() {
        let (engine, cache) = engine();
        cache.restore(&MemoryStore::with_entries([("teamId_acme", "T1")]));
        assert_eq!(
            redirect_of(&engine, "https://acme.slack.com/archives/C%201").as_deref(),
            Some("https://app.slack.com/client/T1/C%201")
        );
    }

    #[test]
    fn non_navigation_kinds_pass_through() {
        let (engine, _) = engine();
        let request =
            NavigationRequest::new("https://acme.slack.com/archives/C123", ResourceKind::Other);
        assert_eq!(engine.decide(&request), RewriteDecision::PassThrough);
    }

    #[test]
    fn non_archive_urls_pass_through() {
        let (engine, cache) = engine();
        for url in [
            "not a url",
            "https://acme.slack.com/messages/C123",
            "https://acme.slack.com/archives",
            "https://acme.slack.com/archives/",
            "https://acme.slack.com/archivesC123",
            "https://example.org/archives/C123",
            "https://slack.com/archives/C123",
        ] {
            assert_eq!(redirect_of(&engine, url), None, "{}", url);
        }
        assert!(cache.is_empty());
    }
}
