//! Request authorization engine: firewalls, identity sources, voters and the salvo hoops
//! that enforce them.

pub mod access_control;
pub mod context;
pub mod decision;
pub mod depot;
pub mod error;
pub mod event;
pub mod firewall;
pub mod handler;
pub mod listener;
pub mod matcher;
pub mod policy;
pub mod role_hierarchy;
pub mod rule;
pub mod source;
pub mod token;
pub mod voter;

#[cfg(test)]
mod test_support;

pub use access_control::{AccessControl, AccessControlRule, PUBLIC_ACCESS};
pub use context::{MatchedAccessControlRule, SecurityContext};
pub use decision::{AccessDecisionManager, DecisionManager, DecisionStrategy};
pub use error::{SecurityError, SecurityResult};
pub use firewall::{CompiledFirewall, FirewallRegistry, Source, SourceTags, StatefulWiring};
pub use listener::SecurityListeners;
pub use policy::{
    Builder, Configuration, FirewallDeclaration, FirewallOverride, GlobalConfiguration,
    MergeStrategy,
};
pub use role_hierarchy::RoleHierarchy;
pub use token::Token;
