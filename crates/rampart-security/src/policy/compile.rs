use std::collections::HashSet;
use std::sync::Arc;

use super::{
    Configuration, FirewallDeclaration, FirewallOverride, GlobalConfiguration, MergeStrategy,
};
use crate::access_control::AccessControl;
use crate::decision::{AccessDecisionManager, DecisionManager};
use crate::error::{SecurityError, SecurityResult};
use crate::firewall::{CompiledFirewall, FirewallRegistry, Source, SourceTags, StatefulWiring};
use crate::role_hierarchy::RoleHierarchy;
use crate::rule::FirewallRules;
use crate::voter::{RoleHierarchyVoter, Voter};

/// ## Summary
/// Validates every declaration and merges it with the global block into an immutable
/// registry. Firewalls keep their declaration order.
///
/// ## Errors
/// Returns the first validation error; it names the offending firewall. No partial
/// registry is ever produced.
#[tracing::instrument(skip_all, fields(firewalls = configuration.firewalls.len()))]
pub fn compile(configuration: Configuration) -> SecurityResult<FirewallRegistry> {
    let Configuration { global, firewalls } = configuration;

    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(firewalls.len());
    for mut declaration in firewalls {
        declaration.name = declaration.name.trim().to_owned();
        validate(&declaration)?;
        if !seen.insert(declaration.name.clone()) {
            return Err(SecurityError::firewall_configuration(
                &declaration.name,
                "duplicate firewall name",
            ));
        }
        let firewall = compile_firewall(&global, declaration)?;
        tracing::debug!(
            firewall = %firewall.name(),
            matcher = %firewall.matcher_description(),
            access_control = %firewall.sources().access_control,
            decision_manager = %firewall.sources().decision_manager,
            role_hierarchy = %firewall.sources().role_hierarchy,
            "Firewall compiled"
        );
        compiled.push(Arc::new(firewall));
    }

    tracing::info!(count = compiled.len(), "Security configuration compiled");
    Ok(FirewallRegistry::new(
        compiled,
        global.access_control.unwrap_or_default(),
    ))
}

fn validate(declaration: &FirewallDeclaration) -> SecurityResult<()> {
    let name = declaration.name.as_str();
    if name.is_empty() {
        return Err(SecurityError::Configuration(
            "firewall name is required".to_string(),
        ));
    }
    let fail = |reason: &str| Err(SecurityError::firewall_configuration(name, reason));

    if declaration.matcher.is_none() {
        return fail("matcher is required");
    }
    if declaration.token_source.is_none() {
        return fail("token source is required");
    }

    let has_login_path = declaration
        .login_path
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());
    let has_logout_path = declaration
        .logout_path
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());

    if declaration.stateless {
        if declaration.login_path.is_some()
            || declaration.logout_path.is_some()
            || declaration.login_handler.is_some()
            || declaration.logout_handler.is_some()
        {
            return fail("stateless firewall must not declare login or logout wiring");
        }
        return Ok(());
    }

    if !has_login_path {
        return fail("stateful firewall requires a login path");
    }
    if !has_logout_path {
        return fail("stateful firewall requires a logout path");
    }
    if declaration.login_handler.is_none() {
        return fail("stateful firewall requires a login handler");
    }
    if declaration.logout_handler.is_none() {
        return fail("stateful firewall requires a logout handler");
    }
    Ok(())
}

fn compile_firewall(
    global: &GlobalConfiguration,
    declaration: FirewallDeclaration,
) -> SecurityResult<CompiledFirewall> {
    let FirewallDeclaration {
        name,
        matcher,
        rules,
        token_source,
        stateless,
        login_path,
        logout_path,
        login_handler,
        logout_handler,
        overrides,
    } = declaration;

    let missing =
        |what: &str| SecurityError::firewall_configuration(&name, format!("{what} is required"));
    let matcher = matcher.ok_or_else(|| missing("matcher"))?;
    let token_source = token_source.ok_or_else(|| missing("token source"))?;

    let wiring = match (login_path, logout_path, login_handler, logout_handler) {
        (Some(login_path), Some(logout_path), Some(login_handler), Some(logout_handler))
            if !stateless =>
        {
            Some(StatefulWiring {
                login_path,
                logout_path,
                login_handler,
                logout_handler,
            })
        }
        _ => None,
    };

    let (role_hierarchy, role_hierarchy_source) =
        pick(overrides.role_hierarchy.as_ref(), global.role_hierarchy.as_ref());
    let (decision_manager, decision_manager_source) = pick(
        overrides.decision_manager.as_ref(),
        global.decision_manager.as_ref(),
    );
    let (entry_point, entry_point_source) =
        pick(overrides.entry_point.as_ref(), global.entry_point.as_ref());
    let (access_denied_handler, access_denied_handler_source) = pick(
        overrides.access_denied_handler.as_ref(),
        global.access_denied_handler.as_ref(),
    );
    let (access_control, access_control_source) =
        merge_access_control(global.access_control.as_ref(), &overrides);

    let decision_manager = match (decision_manager, &role_hierarchy) {
        (Some(manager), Some(hierarchy)) => Some(upgrade_role_voters(manager, hierarchy)),
        (manager, _) => manager,
    };

    Ok(CompiledFirewall {
        matcher_description: matcher.description(),
        name,
        matcher,
        rules: FirewallRules::new(rules),
        token_source,
        stateless,
        access_control,
        decision_manager,
        role_hierarchy,
        entry_point,
        access_denied_handler,
        wiring,
        sources: SourceTags {
            role_hierarchy: role_hierarchy_source,
            decision_manager: decision_manager_source,
            access_control: access_control_source,
            entry_point: entry_point_source,
            access_denied_handler: access_denied_handler_source,
        },
    })
}

/// Firewall value over global value, tagging where the result came from.
fn pick<T: Clone>(local: Option<&T>, global: Option<&T>) -> (Option<T>, Source) {
    match (local, global) {
        (Some(local), _) => (Some(local.clone()), Source::Firewall),
        (None, Some(global)) => (Some(global.clone()), Source::Global),
        (None, None) => (None, Source::None),
    }
}

fn merge_access_control(
    global: Option<&AccessControl>,
    overrides: &FirewallOverride,
) -> (AccessControl, Source) {
    let local = overrides.access_control.clone().unwrap_or_default();
    let global = global.cloned().unwrap_or_default();

    match (
        overrides.merge_strategy,
        overrides.inherit_global_access_control,
    ) {
        (MergeStrategy::OverrideOnly, _) | (_, false) => (local, Source::Firewall),
        (MergeStrategy::LocalFirst, true) => {
            (AccessControl::concat(&local, &global), Source::Merged)
        }
        (MergeStrategy::GlobalFirst, true) => {
            (AccessControl::concat(&global, &local), Source::Merged)
        }
    }
}

/// Rebuilds a voter-based manager with every plain role voter wrapped in a
/// [`RoleHierarchyVoter`]. Other managers are returned unchanged.
fn upgrade_role_voters(
    manager: Arc<dyn DecisionManager>,
    hierarchy: &Arc<RoleHierarchy>,
) -> Arc<dyn DecisionManager> {
    let upgraded = manager
        .as_voting()
        .filter(|voting| voting.voters().iter().any(|voter| voter.is_role_voter()))
        .map(|voting| {
            let voters = voting
                .voters()
                .iter()
                .map(|voter| {
                    if voter.is_role_voter() {
                        Arc::new(RoleHierarchyVoter::new(hierarchy.clone(), voter.clone()))
                            as Arc<dyn Voter>
                    } else {
                        voter.clone()
                    }
                })
                .collect();
            AccessDecisionManager::new(voting.strategy(), voters)
        });

    match upgraded {
        Some(upgraded) => Arc::new(upgraded),
        None => manager,
    }
}
