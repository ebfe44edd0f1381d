use std::any::Any;
use std::sync::Arc;

use casbin::{CoreApi, MgmtApi};
use salvo::Request;

use super::{Vote, Voter};
use crate::error::{SecurityError, SecurityResult};
use crate::token::Token;

/// Model evaluated by [`CasbinVoter`]: `(subject, path, action)` with role grouping and
/// `keyMatch` path patterns.
pub const CASBIN_MODEL: &str = include_str!("casbin_model.conf");

/// Voter for permission attributes such as `perm:edit`, backed by a casbin enforcer.
///
/// The action is the attribute with the prefix stripped. The object is the request path
/// taken from the subject (a `salvo::Request` or a `String` path). Each of the token's
/// roles and its user identifier is tried as the casbin subject; enforcement errors deny.
pub struct CasbinVoter {
    enforcer: Arc<casbin::Enforcer>,
    prefix: String,
}

impl CasbinVoter {
    #[must_use]
    pub fn new(enforcer: Arc<casbin::Enforcer>, prefix: impl Into<String>) -> Self {
        Self {
            enforcer,
            prefix: prefix.into(),
        }
    }

    /// ## Summary
    /// Builds a voter from policy CSV text using [`CASBIN_MODEL`].
    ///
    /// ## Errors
    /// Returns a configuration error if the model or the policy fails to load.
    #[tracing::instrument(skip(policy))]
    pub async fn from_policy(policy: &str, prefix: &str) -> SecurityResult<Self> {
        let model = casbin::DefaultModel::from_str(CASBIN_MODEL)
            .await
            .map_err(|e| SecurityError::Configuration(format!("casbin model: {e}")))?;
        let adapter = string_adapter::StringAdapter::new(policy);
        let enforcer = casbin::Enforcer::new(model, adapter)
            .await
            .map_err(|e| SecurityError::Configuration(format!("casbin policy: {e}")))?;

        tracing::info!(
            policy_count = enforcer.get_policy().len(),
            grouping_count = enforcer.get_grouping_policy().len(),
            "Casbin voter initialized"
        );
        Ok(Self::new(Arc::new(enforcer), prefix))
    }

    fn action<'a>(&self, attribute: &'a str) -> Option<&'a str> {
        attribute
            .strip_prefix(self.prefix.as_str())
            .filter(|action| !action.is_empty())
    }
}

fn subject_path(subject: Option<&dyn Any>) -> Option<&str> {
    let subject = subject?;
    if let Some(req) = subject.downcast_ref::<Request>() {
        return Some(req.uri().path());
    }
    subject.downcast_ref::<String>().map(String::as_str)
}

impl Voter for CasbinVoter {
    fn name(&self) -> &'static str {
        "casbin"
    }

    fn supports(&self, attribute: &str, _subject: Option<&dyn Any>) -> bool {
        self.action(attribute).is_some()
    }

    fn vote(&self, token: &Token, attribute: &str, subject: Option<&dyn Any>) -> Vote {
        let Some(action) = self.action(attribute) else {
            return Vote::Abstain;
        };
        let Some(path) = subject_path(subject) else {
            return Vote::Abstain;
        };
        if !token.is_authenticated() {
            return Vote::Denied;
        }

        let subjects = token
            .roles()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(token.user_identifier()));
        for sub in subjects {
            match self.enforcer.enforce((sub, path, action)) {
                Ok(true) => {
                    tracing::trace!(subject = %sub, path = %path, action = %action, "Casbin allowed");
                    return Vote::Granted;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(error = %e, subject = %sub, path = %path, "Casbin enforcement failed");
                    return Vote::Denied;
                }
            }
        }
        Vote::Denied
    }
}
