use std::any::Any;
use std::sync::Arc;

use super::{RoleVoter, Vote, Voter};
use crate::role_hierarchy::RoleHierarchy;
use crate::token::Token;

/// Role voter that expands the token's roles through a [`RoleHierarchy`] first.
///
/// Support is delegated to the wrapped role voter.
pub struct RoleHierarchyVoter {
    hierarchy: Arc<RoleHierarchy>,
    delegate: Arc<dyn Voter>,
}

impl RoleHierarchyVoter {
    #[must_use]
    pub fn new(hierarchy: Arc<RoleHierarchy>, delegate: Arc<dyn Voter>) -> Self {
        Self {
            hierarchy,
            delegate,
        }
    }

    #[must_use]
    pub fn with_role_voter(hierarchy: Arc<RoleHierarchy>) -> Self {
        Self::new(hierarchy, Arc::new(RoleVoter::new()))
    }
}

impl Voter for RoleHierarchyVoter {
    fn name(&self) -> &'static str {
        "role_hierarchy"
    }

    fn supports(&self, attribute: &str, subject: Option<&dyn Any>) -> bool {
        self.delegate.supports(attribute, subject)
    }

    fn vote(&self, token: &Token, attribute: &str, subject: Option<&dyn Any>) -> Vote {
        if !token.is_authenticated() {
            return self.delegate.vote(token, attribute, subject);
        }
        let expanded = Token::authenticated(
            token.user_identifier(),
            self.hierarchy.expand_roles(token.roles()),
        );
        self.delegate.vote(&expanded, attribute, subject)
    }
}
