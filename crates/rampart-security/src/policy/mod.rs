//! Declarative security configuration: a global block plus ordered firewall
//! declarations, compiled once at startup.

mod compile;

use std::sync::Arc;

use crate::access_control::AccessControl;
use crate::decision::DecisionManager;
use crate::error::{SecurityError, SecurityResult};
use crate::firewall::{FirewallRegistry, StatefulWiring};
use crate::handler::{AccessDeniedHandler, EntryPoint, LoginHandler, LogoutHandler};
use crate::matcher::Matcher;
use crate::role_hierarchy::RoleHierarchy;
use crate::rule::Rule;
use crate::source::TokenSource;

pub use compile::compile;

/// How a firewall's own access-control rules combine with the global ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Local rules, then global rules.
    #[default]
    LocalFirst,
    /// Global rules, then local rules.
    GlobalFirst,
    /// Local rules only, even when empty.
    OverrideOnly,
}

/// Settings shared by every firewall unless overridden.
#[derive(Clone, Default)]
pub struct GlobalConfiguration {
    pub access_control: Option<AccessControl>,
    pub role_hierarchy: Option<Arc<RoleHierarchy>>,
    pub decision_manager: Option<Arc<dyn DecisionManager>>,
    pub entry_point: Option<Arc<dyn EntryPoint>>,
    pub access_denied_handler: Option<Arc<dyn AccessDeniedHandler>>,
}

impl GlobalConfiguration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_access_control(mut self, access_control: AccessControl) -> Self {
        self.access_control = Some(access_control);
        self
    }

    #[must_use]
    pub fn with_role_hierarchy(mut self, hierarchy: RoleHierarchy) -> Self {
        self.role_hierarchy = Some(Arc::new(hierarchy));
        self
    }

    #[must_use]
    pub fn with_decision_manager(mut self, manager: Arc<dyn DecisionManager>) -> Self {
        self.decision_manager = Some(manager);
        self
    }

    #[must_use]
    pub fn with_entry_point(mut self, entry_point: Arc<dyn EntryPoint>) -> Self {
        self.entry_point = Some(entry_point);
        self
    }

    #[must_use]
    pub fn with_access_denied_handler(mut self, handler: Arc<dyn AccessDeniedHandler>) -> Self {
        self.access_denied_handler = Some(handler);
        self
    }
}

/// Per-firewall overrides of the global settings.
#[derive(Clone)]
pub struct FirewallOverride {
    pub inherit_global_access_control: bool,
    pub merge_strategy: MergeStrategy,
    pub access_control: Option<AccessControl>,
    pub role_hierarchy: Option<Arc<RoleHierarchy>>,
    pub decision_manager: Option<Arc<dyn DecisionManager>>,
    pub entry_point: Option<Arc<dyn EntryPoint>>,
    pub access_denied_handler: Option<Arc<dyn AccessDeniedHandler>>,
}

impl Default for FirewallOverride {
    fn default() -> Self {
        Self::new()
    }
}

impl FirewallOverride {
    /// ## Summary
    /// No overrides: local-first merge, inheriting the global access control.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inherit_global_access_control: true,
            merge_strategy: MergeStrategy::LocalFirst,
            access_control: None,
            role_hierarchy: None,
            decision_manager: None,
            entry_point: None,
            access_denied_handler: None,
        }
    }

    #[must_use]
    pub const fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    #[must_use]
    pub const fn with_inherit_global(mut self, inherit: bool) -> Self {
        self.inherit_global_access_control = inherit;
        self
    }

    #[must_use]
    pub fn with_access_control(mut self, access_control: AccessControl) -> Self {
        self.access_control = Some(access_control);
        self
    }

    #[must_use]
    pub fn with_role_hierarchy(mut self, hierarchy: RoleHierarchy) -> Self {
        self.role_hierarchy = Some(Arc::new(hierarchy));
        self
    }

    #[must_use]
    pub fn with_decision_manager(mut self, manager: Arc<dyn DecisionManager>) -> Self {
        self.decision_manager = Some(manager);
        self
    }

    #[must_use]
    pub fn with_entry_point(mut self, entry_point: Arc<dyn EntryPoint>) -> Self {
        self.entry_point = Some(entry_point);
        self
    }

    #[must_use]
    pub fn with_access_denied_handler(mut self, handler: Arc<dyn AccessDeniedHandler>) -> Self {
        self.access_denied_handler = Some(handler);
        self
    }
}

/// One firewall as declared, before validation and merging.
#[derive(Clone)]
pub struct FirewallDeclaration {
    pub name: String,
    pub matcher: Option<Arc<dyn Matcher>>,
    pub rules: Vec<Arc<dyn Rule>>,
    pub token_source: Option<Arc<dyn TokenSource>>,
    pub stateless: bool,
    pub login_path: Option<String>,
    pub logout_path: Option<String>,
    pub login_handler: Option<Arc<dyn LoginHandler>>,
    pub logout_handler: Option<Arc<dyn LogoutHandler>>,
    pub overrides: FirewallOverride,
}

impl FirewallDeclaration {
    /// ## Summary
    /// A stateless declaration with the given name and no other settings.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matcher: None,
            rules: Vec::new(),
            token_source: None,
            stateless: true,
            login_path: None,
            logout_path: None,
            login_handler: None,
            logout_handler: None,
            overrides: FirewallOverride::new(),
        }
    }
}

/// Everything [`compile`] needs.
#[derive(Clone, Default)]
pub struct Configuration {
    pub global: GlobalConfiguration,
    pub firewalls: Vec<FirewallDeclaration>,
}

/// Collects the global block and firewall declarations.
///
/// Misuse (a second global block) is recorded and reported by [`Builder::compile`].
#[derive(Default)]
pub struct Builder {
    global: Option<GlobalConfiguration>,
    firewalls: Vec<FirewallDeclaration>,
    error: Option<SecurityError>,
}

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Sets the global block. May be called once.
    #[must_use]
    pub fn set_global(mut self, global: GlobalConfiguration) -> Self {
        if self.global.is_some() {
            if self.error.is_none() {
                self.error = Some(SecurityError::Configuration(
                    "global configuration already set".to_string(),
                ));
            }
        } else {
            self.global = Some(global);
        }
        self
    }

    #[must_use]
    pub fn add_firewall(mut self, declaration: FirewallDeclaration) -> Self {
        self.firewalls.push(declaration);
        self
    }

    #[must_use]
    pub fn add_stateless_firewall(
        self,
        name: impl Into<String>,
        matcher: Arc<dyn Matcher>,
        rules: Vec<Arc<dyn Rule>>,
        token_source: Arc<dyn TokenSource>,
        overrides: FirewallOverride,
    ) -> Self {
        self.add_firewall(FirewallDeclaration {
            matcher: Some(matcher),
            rules,
            token_source: Some(token_source),
            overrides,
            ..FirewallDeclaration::named(name)
        })
    }

    #[must_use]
    pub fn add_stateful_firewall(
        self,
        name: impl Into<String>,
        matcher: Arc<dyn Matcher>,
        rules: Vec<Arc<dyn Rule>>,
        token_source: Arc<dyn TokenSource>,
        wiring: StatefulWiring,
        overrides: FirewallOverride,
    ) -> Self {
        self.add_firewall(FirewallDeclaration {
            matcher: Some(matcher),
            rules,
            token_source: Some(token_source),
            stateless: false,
            login_path: Some(wiring.login_path),
            logout_path: Some(wiring.logout_path),
            login_handler: Some(wiring.login_handler),
            logout_handler: Some(wiring.logout_handler),
            overrides,
            ..FirewallDeclaration::named(name)
        })
    }

    /// ## Summary
    /// The collected configuration.
    ///
    /// ## Errors
    /// Returns the first misuse recorded while building.
    pub fn build(self) -> SecurityResult<Configuration> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(Configuration {
            global: self.global.unwrap_or_default(),
            firewalls: self.firewalls,
        })
    }

    /// ## Summary
    /// Builds and compiles in one step.
    ///
    /// ## Errors
    /// Returns the first builder misuse or compile error.
    pub fn compile(self) -> SecurityResult<FirewallRegistry> {
        compile(self.build()?)
    }
}
