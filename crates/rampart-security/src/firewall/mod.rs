//! Compiled, immutable firewalls and the registry matching requests to them.

mod registry;

use std::fmt;
use std::sync::Arc;

use salvo::{Request, Response};

use crate::access_control::AccessControl;
use crate::decision::DecisionManager;
use crate::error::{SecurityError, SecurityResult};
use crate::event::{EventDispatcher, RequestSnapshot, SecurityEvent};
use crate::handler::{
    AccessDeniedHandler, EntryPoint, LoginHandler, LoginInput, LoginResult, LogoutHandler,
    LogoutInput,
};
use crate::matcher::Matcher;
use crate::role_hierarchy::RoleHierarchy;
use crate::rule::FirewallRules;
use crate::source::TokenSource;

pub use registry::FirewallRegistry;

/// Where an effective firewall setting came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Source {
    /// Not configured anywhere.
    #[default]
    None,
    Global,
    Firewall,
    /// Firewall and global values combined.
    Merged,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Global => "global",
            Self::Firewall => "firewall",
            Self::Merged => "merged",
        })
    }
}

/// Provenance of every mergeable firewall setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceTags {
    pub role_hierarchy: Source,
    pub decision_manager: Source,
    pub access_control: Source,
    pub entry_point: Source,
    pub access_denied_handler: Source,
}

/// Login and logout wiring of a stateful firewall.
#[derive(Clone)]
pub struct StatefulWiring {
    pub login_path: String,
    pub logout_path: String,
    pub login_handler: Arc<dyn LoginHandler>,
    pub logout_handler: Arc<dyn LogoutHandler>,
}

/// A firewall after global and local settings were merged. Never mutated after compile.
pub struct CompiledFirewall {
    pub(crate) name: String,
    pub(crate) matcher: Arc<dyn Matcher>,
    pub(crate) matcher_description: String,
    pub(crate) rules: FirewallRules,
    pub(crate) token_source: Arc<dyn TokenSource>,
    pub(crate) stateless: bool,
    pub(crate) access_control: AccessControl,
    pub(crate) decision_manager: Option<Arc<dyn DecisionManager>>,
    pub(crate) role_hierarchy: Option<Arc<RoleHierarchy>>,
    pub(crate) entry_point: Option<Arc<dyn EntryPoint>>,
    pub(crate) access_denied_handler: Option<Arc<dyn AccessDeniedHandler>>,
    pub(crate) wiring: Option<StatefulWiring>,
    pub(crate) sources: SourceTags,
}

impl fmt::Debug for CompiledFirewall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFirewall")
            .field("name", &self.name)
            .field("matcher", &self.matcher_description)
            .field("token_source", &self.token_source.name())
            .field("stateless", &self.stateless)
            .field("rules", &self.rules.len())
            .field("access_control", &self.access_control)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl CompiledFirewall {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn matches(&self, req: &Request) -> bool {
        self.matcher.matches(req)
    }

    #[must_use]
    pub fn matcher_description(&self) -> &str {
        &self.matcher_description
    }

    #[must_use]
    pub const fn rules(&self) -> &FirewallRules {
        &self.rules
    }

    #[must_use]
    pub fn token_source(&self) -> &Arc<dyn TokenSource> {
        &self.token_source
    }

    #[must_use]
    pub const fn is_stateless(&self) -> bool {
        self.stateless
    }

    #[must_use]
    pub const fn access_control(&self) -> &AccessControl {
        &self.access_control
    }

    #[must_use]
    pub fn decision_manager(&self) -> Option<&Arc<dyn DecisionManager>> {
        self.decision_manager.as_ref()
    }

    #[must_use]
    pub fn role_hierarchy(&self) -> Option<&Arc<RoleHierarchy>> {
        self.role_hierarchy.as_ref()
    }

    #[must_use]
    pub fn entry_point(&self) -> Option<&Arc<dyn EntryPoint>> {
        self.entry_point.as_ref()
    }

    #[must_use]
    pub fn access_denied_handler(&self) -> Option<&Arc<dyn AccessDeniedHandler>> {
        self.access_denied_handler.as_ref()
    }

    #[must_use]
    pub fn login_path(&self) -> Option<&str> {
        self.wiring.as_ref().map(|w| w.login_path.as_str())
    }

    #[must_use]
    pub fn logout_path(&self) -> Option<&str> {
        self.wiring.as_ref().map(|w| w.logout_path.as_str())
    }

    #[must_use]
    pub const fn sources(&self) -> SourceTags {
        self.sources
    }

    /// ## Summary
    /// Runs the firewall's login handler and publishes `LoginSuccess` or `LoginFailure`.
    ///
    /// ## Errors
    /// Returns a configuration error when the firewall has no login handler, or the
    /// handler's error when the login is rejected.
    #[tracing::instrument(skip_all, fields(firewall = %self.name))]
    pub async fn login(
        &self,
        req: &mut Request,
        res: &mut Response,
        events: &EventDispatcher,
        input: LoginInput,
    ) -> SecurityResult<LoginResult> {
        let Some(wiring) = &self.wiring else {
            return Err(SecurityError::firewall_configuration(
                &self.name,
                "no login handler configured",
            ));
        };
        let snapshot = RequestSnapshot::from(&*req);

        match wiring.login_handler.login(req, res, input).await {
            Ok(result) => {
                tracing::info!(user = %result.token.user_identifier(), "Login succeeded");
                events.dispatch(&SecurityEvent::login_success(
                    snapshot,
                    &self.name,
                    result.token.clone(),
                ));
                Ok(result)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Login failed");
                events.dispatch(&SecurityEvent::login_failure(
                    snapshot,
                    &self.name,
                    error.clone(),
                ));
                Err(error)
            }
        }
    }

    /// ## Summary
    /// Runs the firewall's logout handler and publishes `LogoutSuccess` or
    /// `LogoutFailure`.
    ///
    /// ## Errors
    /// Returns a configuration error when the firewall has no logout handler, or the
    /// handler's error when the logout fails.
    #[tracing::instrument(skip_all, fields(firewall = %self.name))]
    pub async fn logout(
        &self,
        req: &mut Request,
        res: &mut Response,
        events: &EventDispatcher,
        input: LogoutInput,
    ) -> SecurityResult<()> {
        let Some(wiring) = &self.wiring else {
            return Err(SecurityError::firewall_configuration(
                &self.name,
                "no logout handler configured",
            ));
        };
        let snapshot = RequestSnapshot::from(&*req);
        let token = input.token.clone();

        match wiring.logout_handler.logout(req, res, input).await {
            Ok(()) => {
                tracing::info!(user = %token.user_identifier(), "Logout succeeded");
                events.dispatch(&SecurityEvent::logout_success(snapshot, &self.name, token));
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %error, "Logout failed");
                events.dispatch(&SecurityEvent::logout_failure(
                    snapshot,
                    &self.name,
                    token,
                    error.clone(),
                ));
                Err(error)
            }
        }
    }
}
