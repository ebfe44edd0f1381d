use std::sync::Arc;

use salvo::Request;

use crate::error::{SecurityError, SecurityResult};
use crate::matcher::Matcher;

/// Pre-check evaluated before identity resolution.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    fn applies(&self, req: &Request) -> bool;

    /// ## Errors
    /// Returns [`SecurityError::RuleCheck`] when the request violates the rule.
    fn check(&self, req: &Request) -> SecurityResult<()>;
}

/// Requires a header to carry an exact value on every request the matcher accepts.
pub struct ApiKeyHeaderRule {
    matcher: Arc<dyn Matcher>,
    header: String,
    expected: String,
}

impl ApiKeyHeaderRule {
    #[must_use]
    pub fn new(
        matcher: Arc<dyn Matcher>,
        header: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            matcher,
            header: header.into(),
            expected: expected.into(),
        }
    }
}

impl Rule for ApiKeyHeaderRule {
    fn name(&self) -> &str {
        "api_key_header"
    }

    fn applies(&self, req: &Request) -> bool {
        self.matcher.matches(req)
    }

    fn check(&self, req: &Request) -> SecurityResult<()> {
        let value = req
            .headers()
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok());
        if value == Some(self.expected.as_str()) {
            Ok(())
        } else {
            Err(SecurityError::RuleCheck {
                rule: self.name().to_owned(),
                reason: format!("header `{}` missing or invalid", self.header),
            })
        }
    }
}

/// Ordered pre-check rules of one firewall.
#[derive(Clone, Default)]
pub struct FirewallRules {
    rules: Vec<Arc<dyn Rule>>,
}

impl FirewallRules {
    #[must_use]
    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// ## Summary
    /// Checks every applying rule in order.
    ///
    /// ## Errors
    /// Returns the error of the first applying rule that fails.
    pub fn check(&self, req: &Request) -> SecurityResult<()> {
        for rule in &self.rules {
            if !rule.applies(req) {
                continue;
            }
            rule.check(req)?;
            tracing::trace!(rule = rule.name(), "Pre-check rule passed");
        }
        Ok(())
    }
}
