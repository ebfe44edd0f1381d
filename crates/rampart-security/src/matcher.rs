use salvo::Request;

/// Selects the requests a firewall (or a pre-check rule) applies to.
pub trait Matcher: Send + Sync {
    fn matches(&self, req: &Request) -> bool;

    /// Human-readable description recorded on the compiled firewall.
    fn description(&self) -> String;
}

/// Matches requests whose path starts with a literal prefix. An empty prefix matches
/// every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request) -> bool {
        req.uri().path().starts_with(&self.prefix)
    }

    fn description(&self) -> String {
        format!("path prefix `{}`", self.prefix)
    }
}

/// Matches every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyMatcher;

impl Matcher for AnyMatcher {
    fn matches(&self, _req: &Request) -> bool {
        true
    }

    fn description(&self) -> String {
        "any request".to_string()
    }
}
