use std::sync::Arc;

use crate::firewall::{CompiledFirewall, Source, SourceTags};
use crate::token::Token;

/// The access-control rule that matched the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedAccessControlRule {
    pub path_prefix: String,
    pub attributes: Vec<String>,
    /// Provenance of the access control the rule belongs to.
    pub source: Source,
    /// Position of the rule in the effective access control.
    pub rule_index: usize,
    /// Firewall whose access control matched; empty for the global fallback.
    pub firewall: String,
}

/// Per-request security state, stored in the request's depot.
///
/// Created once after firewall matching. Only the matched rule changes afterwards.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    firewall: Arc<CompiledFirewall>,
    token: Token,
    matched_rule: Option<MatchedAccessControlRule>,
    sources: SourceTags,
}

impl SecurityContext {
    #[must_use]
    pub fn new(firewall: Arc<CompiledFirewall>, token: Token) -> Self {
        let sources = firewall.sources();
        Self {
            firewall,
            token,
            matched_rule: None,
            sources,
        }
    }

    #[must_use]
    pub const fn firewall(&self) -> &Arc<CompiledFirewall> {
        &self.firewall
    }

    #[must_use]
    pub const fn token(&self) -> &Token {
        &self.token
    }

    #[must_use]
    pub const fn matched_rule(&self) -> Option<&MatchedAccessControlRule> {
        self.matched_rule.as_ref()
    }

    #[must_use]
    pub const fn sources(&self) -> SourceTags {
        self.sources
    }

    #[must_use]
    pub fn matcher_description(&self) -> &str {
        self.firewall.matcher_description()
    }

    pub fn set_matched_rule(&mut self, rule: MatchedAccessControlRule) {
        self.matched_rule = Some(rule);
    }

    /// ## Summary
    /// Whether the token holds `role`, directly or through the firewall's role
    /// hierarchy. Anonymous tokens hold no roles.
    #[must_use]
    pub fn is_granted(&self, role: &str) -> bool {
        if role.is_empty() || !self.token.is_authenticated() {
            return false;
        }
        match self.firewall.role_hierarchy() {
            Some(hierarchy) => hierarchy
                .expand_roles(self.token.roles())
                .iter()
                .any(|r| r == role),
            None => self.token.roles().iter().any(|r| r == role),
        }
    }
}
