use std::any::Any;

use super::{Vote, Voter};
use crate::token::Token;

/// Grants an attribute when the token holds it as a role.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleVoter;

impl RoleVoter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Voter for RoleVoter {
    fn name(&self) -> &'static str {
        "role"
    }

    fn supports(&self, attribute: &str, _subject: Option<&dyn Any>) -> bool {
        !attribute.is_empty()
    }

    fn vote(&self, token: &Token, attribute: &str, _subject: Option<&dyn Any>) -> Vote {
        if attribute.is_empty() {
            return Vote::Abstain;
        }
        if token.roles().iter().any(|role| role == attribute) {
            Vote::Granted
        } else {
            Vote::Denied
        }
    }

    fn is_role_voter(&self) -> bool {
        true
    }
}
