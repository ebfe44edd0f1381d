//! Translates the declarative `[security]` settings into a compiled firewall registry.

mod audit;
mod handlers;
mod proxy;

use std::sync::Arc;

use rampart_core::config::{
    AccessRuleSettings, FirewallSettings, GlobalSecuritySettings, MergeSetting,
    RoleInheritanceSettings, SecuritySettings, StrategySetting,
};
use rampart_security::event::EventDispatcher;
use rampart_security::handler::{DefaultAccessDeniedHandler, LoginRedirectEntryPoint};
use rampart_security::matcher::{Matcher, PathPrefixMatcher};
use rampart_security::rule::{ApiKeyHeaderRule, Rule};
use rampart_security::source::{
    ApiKeyHeaderAuthenticator, Authenticator, AuthenticatorManager, AuthenticatorTokenSource,
    ResolverTokenSource, TokenSource,
};
use rampart_security::voter::{CasbinVoter, RoleVoter, Voter};
use rampart_security::{
    AccessControl, AccessDecisionManager, Builder, DecisionManager, DecisionStrategy,
    FirewallDeclaration, FirewallOverride, GlobalConfiguration, MergeStrategy, RoleHierarchy,
    SecurityListeners,
};

use crate::error::{AppError, AppResult};

pub use audit::{AUDIT_LISTENER_PRIORITY, AuditListener};
pub use handlers::{TokenLoginHandler, TokenLogoutHandler};
pub use proxy::ProxyHeaderAuthenticator;

/// Attribute prefix routed to the casbin voter.
pub const PERMISSION_PREFIX: &str = "perm:";

/// ## Summary
/// Validates `settings`, compiles every firewall and registers the security listeners
/// together with the audit listener.
///
/// ## Errors
/// Returns an error if the settings are invalid, the casbin policy cannot be read or
/// loaded, or any firewall fails to compile.
#[tracing::instrument(skip(settings), fields(firewalls = settings.firewalls.len()))]
pub async fn build_security(settings: &SecuritySettings) -> AppResult<SecurityListeners> {
    settings.validate()?;

    let permissions = match &settings.global.casbin_policy {
        Some(path) => Some(load_permission_voter(path).await?),
        None => None,
    };

    let mut builder =
        Builder::new().set_global(global_configuration(&settings.global, permissions.as_ref()));
    for firewall in &settings.firewalls {
        builder = builder.add_firewall(firewall_declaration(firewall, permissions.as_ref())?);
    }
    let registry = builder.compile()?;

    let mut events = EventDispatcher::new();
    events.add_listener(AUDIT_LISTENER_PRIORITY, Arc::new(AuditListener));

    Ok(SecurityListeners::register(registry, events))
}

async fn load_permission_voter(path: &str) -> AppResult<Arc<dyn Voter>> {
    let policy = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::Io {
            path: path.to_owned(),
            source,
        })?;
    let voter = CasbinVoter::from_policy(&policy, PERMISSION_PREFIX).await?;
    Ok(Arc::new(voter))
}

const fn decision_strategy(setting: StrategySetting) -> DecisionStrategy {
    match setting {
        StrategySetting::Affirmative => DecisionStrategy::Affirmative,
        StrategySetting::Consensus => DecisionStrategy::Consensus,
        StrategySetting::Unanimous => DecisionStrategy::Unanimous,
    }
}

const fn merge_strategy(setting: MergeSetting) -> MergeStrategy {
    match setting {
        MergeSetting::LocalFirst => MergeStrategy::LocalFirst,
        MergeSetting::GlobalFirst => MergeStrategy::GlobalFirst,
        MergeSetting::OverrideOnly => MergeStrategy::OverrideOnly,
    }
}

fn decision_manager(
    strategy: StrategySetting,
    permissions: Option<&Arc<dyn Voter>>,
) -> Arc<dyn DecisionManager> {
    let mut voters: Vec<Arc<dyn Voter>> = vec![Arc::new(RoleVoter::new())];
    voters.extend(permissions.cloned());
    Arc::new(AccessDecisionManager::new(
        decision_strategy(strategy),
        voters,
    ))
}

fn access_control(rules: &[AccessRuleSettings]) -> AccessControl {
    rules.iter().fold(AccessControl::default(), |access, rule| {
        access.with_rule(rule.path.clone(), &rule.attributes)
    })
}

fn role_hierarchy(edges: &[RoleInheritanceSettings]) -> RoleHierarchy {
    edges
        .iter()
        .map(|edge| (edge.role.clone(), edge.inherits.clone()))
        .collect()
}

fn global_configuration(
    settings: &GlobalSecuritySettings,
    permissions: Option<&Arc<dyn Voter>>,
) -> GlobalConfiguration {
    let mut global = GlobalConfiguration::new();
    if let Some(strategy) = settings.strategy {
        global = global.with_decision_manager(decision_manager(strategy, permissions));
    }
    if let Some(edges) = &settings.role_hierarchy {
        global = global.with_role_hierarchy(role_hierarchy(edges));
    }
    if let Some(rules) = &settings.access_control {
        global = global.with_access_control(access_control(rules));
    }
    if let Some(login_path) = &settings.login_path {
        global =
            global.with_entry_point(Arc::new(LoginRedirectEntryPoint::new(login_path.clone())));
    }
    if settings.denied_handler {
        global = global.with_access_denied_handler(Arc::new(DefaultAccessDeniedHandler));
    }
    global
}

fn firewall_overrides(
    settings: &FirewallSettings,
    permissions: Option<&Arc<dyn Voter>>,
) -> FirewallOverride {
    let mut overrides = FirewallOverride::new()
        .with_merge_strategy(merge_strategy(settings.merge))
        .with_inherit_global(settings.inherit_global);
    if let Some(rules) = &settings.access_control {
        overrides = overrides.with_access_control(access_control(rules));
    }
    if let Some(edges) = &settings.role_hierarchy {
        overrides = overrides.with_role_hierarchy(role_hierarchy(edges));
    }
    if let Some(strategy) = settings.strategy {
        overrides = overrides.with_decision_manager(decision_manager(strategy, permissions));
    }
    overrides
}

fn token_source(settings: &FirewallSettings) -> AppResult<Arc<dyn TokenSource>> {
    let mut authenticators: Vec<Arc<dyn Authenticator>> = Vec::new();
    if let Some(api_key) = &settings.api_key {
        authenticators.push(Arc::new(ApiKeyHeaderAuthenticator::new(
            api_key.header.clone(),
            api_key.value.clone(),
            api_key.user.clone(),
            api_key.roles.clone(),
        )?));
    }
    if let Some(proxy) = &settings.proxy {
        authenticators.push(Arc::new(ProxyHeaderAuthenticator::from_settings(proxy)));
    }

    if authenticators.is_empty() {
        return Ok(Arc::new(ResolverTokenSource::anonymous()));
    }
    Ok(Arc::new(AuthenticatorTokenSource::new(
        AuthenticatorManager::new(authenticators),
    )))
}

/// ## Summary
/// Builds the engine declaration for one configured firewall.
///
/// ## Errors
/// Returns an error if an authenticator rejects its settings.
pub fn firewall_declaration(
    settings: &FirewallSettings,
    permissions: Option<&Arc<dyn Voter>>,
) -> AppResult<FirewallDeclaration> {
    let matcher: Arc<dyn Matcher> = Arc::new(PathPrefixMatcher::new(settings.path_prefix.clone()));
    let mut rules: Vec<Arc<dyn Rule>> = Vec::new();
    if let Some(required) = &settings.required_header {
        rules.push(Arc::new(ApiKeyHeaderRule::new(
            matcher.clone(),
            required.header.clone(),
            required.value.clone(),
        )));
    }

    let declaration = FirewallDeclaration {
        matcher: Some(matcher),
        rules,
        token_source: Some(token_source(settings)?),
        overrides: firewall_overrides(settings, permissions),
        ..FirewallDeclaration::named(settings.name.clone())
    };
    if settings.stateless {
        return Ok(declaration);
    }

    Ok(FirewallDeclaration {
        stateless: false,
        login_path: Some(settings.effective_login_path().to_owned()),
        logout_path: Some(settings.effective_logout_path().to_owned()),
        login_handler: Some(Arc::new(TokenLoginHandler)),
        logout_handler: Some(Arc::new(TokenLogoutHandler)),
        ..declaration
    })
}
