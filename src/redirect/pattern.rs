use anyhow::{bail, Result};
use regex::Regex;
use std::fmt;
use url::Url;

/// A browser-style match pattern such as `*://*.slack.com/archives/*`.
///
/// `*` as scheme matches `http` and `https`. A host of `*.example.com`
/// matches `example.com` and any of its subdomains. In the path, `*`
/// matches any run of characters, including the query string.
#[derive(Debug, Clone)]
pub struct MatchPattern {
    source: String,
    scheme: Option<String>,
    host: HostPattern,
    path: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Any,
    Exact(String),
    WithSubdomains(String),
}

impl MatchPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let Some((scheme, rest)) = pattern.split_once("://") else {
            bail!("Missing scheme separator in match pattern `{}`", pattern);
        };
        let Some(slash) = rest.find('/') else {
            bail!("Missing path in match pattern `{}`", pattern);
        };
        let (host, path) = rest.split_at(slash);

        let scheme = match scheme {
            "*" => None,
            "" => bail!("Empty scheme in match pattern `{}`", pattern),
            other => Some(other.to_ascii_lowercase()),
        };

        let host = match host {
            "*" => HostPattern::Any,
            "" => bail!("Empty host in match pattern `{}`", pattern),
            h if h.starts_with("*.") => HostPattern::WithSubdomains(h[2..].to_ascii_lowercase()),
            h if h.contains('*') => bail!("Wildcard must lead the host in `{}`", pattern),
            h => HostPattern::Exact(h.to_ascii_lowercase()),
        };

        let path = path
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let path = Regex::new(&format!("^{}$", path))?;

        Ok(MatchPattern {
            source: pattern.to_string(),
            scheme,
            host,
            path,
        })
    }

    /// Matches scheme, host and path plus query; the fragment is ignored.
    pub fn matches(&self, url: &Url) -> bool {
        let scheme_ok = match &self.scheme {
            Some(scheme) => url.scheme() == scheme,
            None => matches!(url.scheme(), "http" | "https"),
        };
        if !scheme_ok {
            return false;
        }

        let Some(host) = url.host_str() else {
            return false;
        };
        let host_ok = match &self.host {
            HostPattern::Any => true,
            HostPattern::Exact(expected) => host == expected,
            HostPattern::WithSubdomains(domain) => {
                host == domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|label| label.ends_with('.'))
            }
        };
        if !host_ok {
            return false;
        }

        match url.query() {
            Some(query) => self.path.is_match(&format!("{}?{}", url.path(), query)),
            None => self.path.is_match(url.path()),
        }
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn archive_pattern() {
        let pattern = MatchPattern::parse("*://*.slack.com/archives/*").unwrap();
        assert!(pattern.matches(&url("https://acme.slack.com/archives/C1/p1?x=1#y")));
        assert!(pattern.matches(&url("http://acme.slack.com/archives/")));
        assert!(pattern.matches(&url("https://slack.com/archives/C1")));
        assert!(!pattern.matches(&url("https://acme.slack.com/messages/C1")));
        assert!(!pattern.matches(&url("https://acme.notslack.com/archives/C1")));
        assert!(!pattern.matches(&url("ftp://acme.slack.com/archives/C1")));
        assert!(!pattern.matches(&url("https://acme.slack.com/archives")));
    }

    #[test]
    fn exact_host_pattern() {
        let pattern = MatchPattern::parse("*://app.slack.com/client/*").unwrap();
        assert!(pattern.matches(&url("https://app.slack.com/client/T1/C1")));
        assert!(!pattern.matches(&url("https://eu.app.slack.com/client/T1")));
        assert!(!pattern.matches(&url("https://acme.slack.com/client/T1")));
    }

    #[test]
    fn literal_characters_are_escaped() {
        let pattern = MatchPattern::parse("https://*/a.b?c").unwrap();
        assert!(pattern.matches(&url("https://x.org/a.b?c")));
        assert!(!pattern.matches(&url("https://x.org/aXb?c")));
        assert!(!pattern.matches(&url("http://x.org/a.b?c")));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        for pattern in ["slack.com/archives/*", "*://*.slack.com", "://x/", "*://a*b.com/"] {
            assert!(MatchPattern::parse(pattern).is_err(), "{}", pattern);
        }
    }

    #[test]
    fn displays_source() {
        let pattern = MatchPattern::parse("*://*.slack.com/archives/*").unwrap();
        assert_eq!(pattern.to_string(), "*://*.slack.com/archives/*");
    }
}
