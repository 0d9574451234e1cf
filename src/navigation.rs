use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Kind of resource an outgoing request loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    MainFrame,
    SubFrame,
    #[serde(other)]
    Other,
}

impl ResourceKind {
    pub fn is_navigation(self) -> bool {
        matches!(self, ResourceKind::MainFrame | ResourceKind::SubFrame)
    }
}

/// An observed outbound request, as delivered by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,
}

impl NavigationRequest {
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            request_id: None,
            url: url.into(),
            kind,
            origin_url: None,
        }
    }

    pub fn with_origin(mut self, origin_url: impl Into<String>) -> Self {
        self.origin_url = Some(origin_url.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Straight to the client URL using a learned team id.
    Direct,
    /// Same-origin `/messages/` URL, redirected once more by the application.
    Messages,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::Messages => write!(f, "messages"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteDecision {
    PassThrough,
    Redirect {
        url: Url,
        workspace: String,
        strategy: Strategy,
    },
}

impl RewriteDecision {
    pub fn redirect_url(&self) -> Option<&Url> {
        match self {
            RewriteDecision::PassThrough => None,
            RewriteDecision::Redirect { url, .. } => Some(url),
        }
    }
}

/// Reply for one request: no `redirectUrl` means the request proceeds untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl BlockingResponse {
    pub fn for_decision(request_id: Option<String>, decision: &RewriteDecision) -> Self {
        Self {
            request_id,
            redirect_url: decision.redirect_url().map(|url| url.to_string()),
        }
    }
}
