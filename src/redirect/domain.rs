/// The host family the redirect operates on, e.g. `slack.com` with its
/// canonical client host `app.slack.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDomain {
    family: String,
    suffix: String,
    canonical_host: String,
}

impl FamilyDomain {
    pub fn new(family: &str, canonical_label: &str) -> Self {
        let family = family.trim_matches('.').to_ascii_lowercase();
        Self {
            suffix: format!(".{}", family),
            canonical_host: format!("{}.{}", canonical_label.to_ascii_lowercase(), family),
            family,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn canonical_host(&self) -> &str {
        &self.canonical_host
    }

    pub fn is_canonical(&self, host: &str) -> bool {
        host == self.canonical_host
    }

    /// Returns the workspace label of a family host (`acme.slack.com` -> `acme`).
    pub fn workspace_of<'a>(&self, host: &'a str) -> Option<&'a str> {
        host.strip_suffix(self.suffix.as_str())
            .filter(|workspace| !workspace.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_host_minus_suffix() {
        let domain = FamilyDomain::new("slack.com", "app");
        assert_eq!(domain.workspace_of("acme.slack.com"), Some("acme"));
        assert_eq!(domain.workspace_of("eu.acme.slack.com"), Some("eu.acme"));
    }

    #[test]
    fn foreign_or_bare_hosts_have_no_workspace() {
        let domain = FamilyDomain::new("slack.com", "app");
        assert_eq!(domain.workspace_of("slack.com"), None);
        assert_eq!(domain.workspace_of("acme.notslack.com"), None);
        assert_eq!(domain.workspace_of("example.org"), None);
    }

    #[test]
    fn canonical_host_is_label_plus_family() {
        let domain = FamilyDomain::new(".Slack.com", "APP");
        assert_eq!(domain.family(), "slack.com");
        assert!(domain.is_canonical("app.slack.com"));
        assert!(!domain.is_canonical("acme.slack.com"));
    }
}
