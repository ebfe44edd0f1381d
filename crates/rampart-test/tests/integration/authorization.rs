#![allow(clippy::expect_used, unused_must_use)]
//! Access-control phase tests.
//!
//! Every test compiles a registry, serves it through both security hoops and checks
//! the response together with the published authorization events.

use std::sync::Arc;

use salvo::http::StatusCode;

use super::helpers::*;
use rampart_test::component::constants::{
    EVENT_AUTHORIZATION_DENIED, EVENT_AUTHORIZATION_GRANTED,
};
use rampart_test::component::event::EventDispatcher;
use rampart_test::component::handler::{AccessDeniedHandler, EntryPoint, LoginRedirectEntryPoint};
use rampart_test::component::matcher::{AnyMatcher, PathPrefixMatcher};
use rampart_test::component::voter::{CasbinVoter, RoleVoter, Voter};

fn admin_rules() -> AccessControl {
    AccessControl::default().with_rule("/admin", ["ROLE_ADMIN"])
}

/// Writes 418 for every denial.
struct TeapotDeniedHandler;

impl AccessDeniedHandler for TeapotDeniedHandler {
    fn handle(
        &self,
        _req: &salvo::Request,
        _error: &SecurityError,
        res: &mut salvo::Response,
    ) -> SecurityResult<()> {
        res.status_code(StatusCode::IM_A_TEAPOT);
        Ok(())
    }
}

/// Reports success without writing anything.
struct SilentEntryPoint;

impl EntryPoint for SilentEntryPoint {
    fn start(&self, _req: &salvo::Request, _res: &mut salvo::Response) -> SecurityResult<()> {
        Ok(())
    }
}

/// Reports success without writing anything.
struct SilentDeniedHandler;

impl AccessDeniedHandler for SilentDeniedHandler {
    fn handle(
        &self,
        _req: &salvo::Request,
        _error: &SecurityError,
        _res: &mut salvo::Response,
    ) -> SecurityResult<()> {
        Ok(())
    }
}

/// ## Summary
/// Anonymous callers on a protected path reach the entry point and the decision
/// manager is never consulted.
#[test_log::test(tokio::test)]
async fn anonymous_request_starts_authentication_without_deciding() {
    let manager = Arc::new(CountingDecisionManager::new(role_manager(
        DecisionStrategy::Affirmative,
    )));
    let (events, recorder) = recording_dispatcher();
    let registry = Builder::new()
        .set_global(
            GlobalConfiguration::new()
                .with_decision_manager(manager.clone())
                .with_entry_point(Arc::new(LoginRedirectEntryPoint::new("/login")))
                .with_access_control(admin_rules()),
        )
        .add_stateless_firewall(
            "main",
            Arc::new(AnyMatcher),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, events);

    TestRequest::get("/admin/users")
        .accept_html()
        .send(&service)
        .await
        .assert_status(StatusCode::FOUND)
        .assert_header("location", "/login");

    let response = TestRequest::get("/admin/users")
        .header("Accept", "application/json")
        .send(&service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "unauthorized");

    assert_eq!(manager.calls(), 0);
    assert_eq!(
        recorder.names(),
        [EVENT_AUTHORIZATION_DENIED, EVENT_AUTHORIZATION_DENIED]
    );
    assert!(matches!(
        recorder.events()[0].error(),
        Some(SecurityError::Unauthenticated { .. })
    ));
}

/// ## Summary
/// Without an entry point the unauthenticated error goes through the exception channel.
#[test_log::test(tokio::test)]
async fn missing_entry_point_yields_json_unauthorized() {
    let registry = Builder::new()
        .set_global(
            GlobalConfiguration::new()
                .with_decision_manager(Arc::new(role_manager(DecisionStrategy::Affirmative)))
                .with_access_control(admin_rules()),
        )
        .add_stateless_firewall(
            "main",
            Arc::new(AnyMatcher),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, EventDispatcher::new());

    TestRequest::get("/admin")
        .accept_html()
        .send(&service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_body_contains("unauthorized");
}

fn hierarchy_registry(manager: Arc<dyn DecisionManager>) -> FirewallRegistry {
    Builder::new()
        .set_global(
            GlobalConfiguration::new()
                .with_decision_manager(manager)
                .with_role_hierarchy(
                    RoleHierarchy::default().with_inheritance("ROLE_ADMIN", ["ROLE_USER"]),
                )
                .with_access_control(
                    admin_rules().with_rule("/reports", ["ROLE_USER"]),
                ),
        )
        .add_stateless_firewall(
            "main",
            Arc::new(AnyMatcher),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile")
}

/// ## Summary
/// Role voters are upgraded with the effective hierarchy, so inherited roles grant.
#[test_log::test(tokio::test)]
async fn inherited_role_is_granted() {
    let (events, recorder) = recording_dispatcher();
    let registry = hierarchy_registry(Arc::new(role_manager(DecisionStrategy::Affirmative)));
    let service = create_test_service(registry, events);

    TestRequest::get("/reports/q3")
        .user("root", &["ROLE_ADMIN"])
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body("main:root");

    assert_eq!(recorder.names(), [EVENT_AUTHORIZATION_GRANTED]);
}

/// ## Summary
/// Inheritance never flows downwards: a user is denied an admin path with 403.
#[test_log::test(tokio::test)]
async fn hierarchy_does_not_grant_parent_roles() {
    let (events, recorder) = recording_dispatcher();
    let registry = hierarchy_registry(Arc::new(role_manager(DecisionStrategy::Affirmative)));
    let service = create_test_service(registry, events);

    let response = TestRequest::get("/admin/settings")
        .user("alice", &["ROLE_USER"])
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json()["error"], "forbidden");

    TestRequest::get("/admin/settings")
        .user("alice", &["ROLE_USER"])
        .accept_html()
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_body_contains("<h1>Forbidden</h1>");

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name(), EVENT_AUTHORIZATION_DENIED);
    assert_eq!(
        events[0].error(),
        Some(&SecurityError::AccessDenied {
            attribute: "ROLE_ADMIN".to_string()
        })
    );
    assert_eq!(events[0].request().path, "/admin/settings");
}

/// ## Summary
/// A manager that cannot be upgraded is asked exactly once per protected request.
#[test_log::test(tokio::test)]
async fn custom_manager_decides_once_per_request() {
    let manager = Arc::new(CountingDecisionManager::new(role_manager(
        DecisionStrategy::Unanimous,
    )));
    let registry = hierarchy_registry(manager.clone());
    let service = create_test_service(registry, EventDispatcher::new());

    TestRequest::get("/reports")
        .user("alice", &["ROLE_USER"])
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    TestRequest::get("/public")
        .user("alice", &["ROLE_USER"])
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(manager.calls(), 1);
}

/// ## Summary
/// With the firewall hoop missing, a matched firewall has no context and the request
/// is rejected with 401 and a denial event.
#[test_log::test(tokio::test)]
async fn missing_security_context_is_unauthorized() {
    let (events, recorder) = recording_dispatcher();
    let registry = hierarchy_registry(Arc::new(role_manager(DecisionStrategy::Affirmative)));
    let service = create_access_control_only_service(registry, events);

    let response = TestRequest::get("/admin")
        .user("root", &["ROLE_ADMIN"])
        .send(&service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "unauthorized");

    assert_eq!(recorder.names(), [EVENT_AUTHORIZATION_DENIED]);
    assert!(matches!(
        recorder.events()[0].error(),
        Some(SecurityError::MissingSecurityContext { .. })
    ));
}

/// ## Summary
/// Protected global paths outside every firewall cannot be decided and answer 401.
#[test_log::test(tokio::test)]
async fn protected_path_outside_firewalls_is_unauthorized() {
    let (events, recorder) = recording_dispatcher();
    let registry = Builder::new()
        .set_global(GlobalConfiguration::new().with_access_control(admin_rules()))
        .add_stateless_firewall(
            "app",
            Arc::new(PathPrefixMatcher::new("/app")),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, events);

    TestRequest::get("/admin")
        .user("root", &["ROLE_ADMIN"])
        .send(&service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    TestRequest::get("/elsewhere")
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body("no-context");

    assert_eq!(recorder.names(), [EVENT_AUTHORIZATION_DENIED]);
}

/// ## Summary
/// `PUBLIC_ACCESS` admits anonymous callers without consulting the decision manager.
#[test_log::test(tokio::test)]
async fn public_access_admits_anonymous_callers() {
    let manager = Arc::new(CountingDecisionManager::new(role_manager(
        DecisionStrategy::Affirmative,
    )));
    let (events, recorder) = recording_dispatcher();
    let registry = Builder::new()
        .set_global(
            GlobalConfiguration::new()
                .with_decision_manager(manager.clone())
                .with_access_control(
                    AccessControl::default()
                        .with_rule("/docs", [PUBLIC_ACCESS])
                        .with_rule("/", Vec::<String>::new()),
                ),
        )
        .add_stateless_firewall(
            "main",
            Arc::new(AnyMatcher),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, events);

    TestRequest::get("/docs/intro")
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body("main:");
    TestRequest::get("/home")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(manager.calls(), 0);
    assert_eq!(recorder.names(), [EVENT_AUTHORIZATION_GRANTED]);
}

/// ## Summary
/// A rule requiring attributes with no decision manager anywhere is a configuration
/// fault, reported as 500 without an authorization event.
#[test_log::test(tokio::test)]
async fn missing_decision_manager_is_a_server_error() {
    let (events, recorder) = recording_dispatcher();
    let registry = Builder::new()
        .set_global(GlobalConfiguration::new().with_access_control(admin_rules()))
        .add_stateless_firewall(
            "main",
            Arc::new(AnyMatcher),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, events);

    let response = TestRequest::get("/admin")
        .user("root", &["ROLE_ADMIN"])
        .send(&service)
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "internal server error");
    assert!(recorder.names().is_empty());
}

/// ## Summary
/// A firewall's own access-denied handler replaces the default forbidden response.
#[test_log::test(tokio::test)]
async fn firewall_denied_handler_overrides_default() {
    let registry = Builder::new()
        .set_global(
            GlobalConfiguration::new()
                .with_decision_manager(Arc::new(role_manager(DecisionStrategy::Affirmative)))
                .with_access_control(admin_rules()),
        )
        .add_stateless_firewall(
            "main",
            Arc::new(AnyMatcher),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new().with_access_denied_handler(Arc::new(TeapotDeniedHandler)),
        )
        .compile()
        .expect("configuration should compile");
    let firewall = registry.firewall("main").expect("main firewall").clone();
    assert_eq!(firewall.sources().access_denied_handler, Source::Firewall);

    let service = create_test_service(registry, EventDispatcher::new());
    TestRequest::get("/admin")
        .user("alice", &["ROLE_USER"])
        .send(&service)
        .await
        .assert_status(StatusCode::IM_A_TEAPOT);
}

/// ## Summary
/// Permission attributes are decided by casbin against the request path, next to the
/// role voter.
#[test_log::test(tokio::test)]
async fn permission_attributes_are_decided_by_casbin() {
    let casbin = CasbinVoter::from_policy("p, ROLE_EDITOR, /docs/*, edit\n", "perm:")
        .await
        .expect("policy should load");
    let manager = AccessDecisionManager::new(
        DecisionStrategy::Affirmative,
        vec![
            Arc::new(RoleVoter::new()) as Arc<dyn Voter>,
            Arc::new(casbin) as Arc<dyn Voter>,
        ],
    );
    let registry = Builder::new()
        .set_global(
            GlobalConfiguration::new()
                .with_decision_manager(Arc::new(manager))
                .with_access_control(AccessControl::default().with_rule("/docs", ["perm:edit"])),
        )
        .add_stateless_firewall(
            "main",
            Arc::new(AnyMatcher),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, EventDispatcher::new());

    TestRequest::get("/docs/guide")
        .user("dave", &["ROLE_EDITOR"])
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    TestRequest::get("/docs/guide")
        .user("erin", &["ROLE_READER"])
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

/// ## Summary
/// Entry points and denied handlers that succeed without writing a response never let
/// a rejected request through as `200 OK`.
#[test_log::test(tokio::test)]
async fn silent_rejection_handlers_still_reject() {
    let registry = Builder::new()
        .set_global(
            GlobalConfiguration::new()
                .with_decision_manager(Arc::new(role_manager(DecisionStrategy::Affirmative)))
                .with_entry_point(Arc::new(SilentEntryPoint))
                .with_access_denied_handler(Arc::new(SilentDeniedHandler))
                .with_access_control(admin_rules()),
        )
        .add_stateless_firewall(
            "main",
            Arc::new(AnyMatcher),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, EventDispatcher::new());

    TestRequest::get("/admin")
        .send(&service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    TestRequest::get("/admin")
        .user("alice", &["ROLE_USER"])
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
