//! Voters cast one vote per attribute; decision managers aggregate them.

mod casbin;
mod hierarchy;
mod role;

use std::any::Any;

use crate::token::Token;

pub use casbin::{CASBIN_MODEL, CasbinVoter};
pub use hierarchy::RoleHierarchyVoter;
pub use role::RoleVoter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Abstain,
    Denied,
    Granted,
}

/// A narrow capability deciding a single attribute.
///
/// `subject` is the object being protected. The request listener passes the current
/// `salvo::Request`; direct callers may pass anything or nothing.
pub trait Voter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn supports(&self, attribute: &str, subject: Option<&dyn Any>) -> bool;

    fn vote(&self, token: &Token, attribute: &str, subject: Option<&dyn Any>) -> Vote;

    /// ## Summary
    /// Whether this voter is a plain role voter that compilation may wrap in a
    /// [`RoleHierarchyVoter`].
    fn is_role_voter(&self) -> bool {
        false
    }
}
