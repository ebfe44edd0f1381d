#![allow(clippy::expect_used, unused_must_use)]
//! Firewall resolution tests: matching, rule checks, identity resolution and faults.

use std::sync::Arc;

use salvo::http::StatusCode;

use super::helpers::*;
use rampart_test::component::constants::{EVENT_LOGIN_FAILURE, EVENT_LOGIN_SUCCESS};
use rampart_test::component::event::EventDispatcher;
use rampart_test::component::matcher::{Matcher, PathPrefixMatcher};
use rampart_test::component::rule::{ApiKeyHeaderRule, Rule};
use rampart_test::component::source::{
    ApiKeyHeaderAuthenticator, Authenticator, AuthenticatorManager, AuthenticatorTokenSource,
};

fn prefixed(prefix: &str) -> Arc<dyn Matcher> {
    Arc::new(PathPrefixMatcher::new(prefix))
}

/// ## Summary
/// A path no firewall matches passes through untouched: no context, no events.
#[test_log::test(tokio::test)]
async fn unmatched_path_passes_without_authentication() {
    let (events, recorder) = recording_dispatcher();
    let registry = Builder::new()
        .add_stateless_firewall(
            "admin",
            prefixed("/admin"),
            Vec::new(),
            Arc::new(PanickingTokenSource),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, events);

    TestRequest::get("/public/page")
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body("no-context");
    assert!(recorder.names().is_empty());
}

/// ## Summary
/// Firewalls are tried in declaration order and the first match wins, even when a
/// later one is more specific.
#[test_log::test(tokio::test)]
async fn first_declared_firewall_wins() {
    let registry = Builder::new()
        .add_stateless_firewall(
            "api",
            prefixed("/api"),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .add_stateless_firewall(
            "admin",
            prefixed("/api/admin"),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, EventDispatcher::new());

    TestRequest::get("/api/admin/users")
        .user("alice", &[])
        .send(&service)
        .await
        .assert_body("api:alice");
}

/// ## Summary
/// A source that resolves nothing still publishes an anonymous context.
#[test_log::test(tokio::test)]
async fn unresolved_identity_is_anonymous() {
    let registry = Builder::new()
        .add_stateless_firewall(
            "main",
            prefixed("/"),
            Vec::new(),
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, EventDispatcher::new());

    TestRequest::get("/anything")
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body("main:");
}

/// ## Summary
/// A panicking token source is contained and reported as a 500 resolution fault.
#[test_log::test(tokio::test)]
async fn panicking_token_source_is_a_server_error() {
    let registry = Builder::new()
        .add_stateless_firewall(
            "main",
            prefixed("/"),
            Vec::new(),
            Arc::new(PanickingTokenSource),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, EventDispatcher::new());

    let response = TestRequest::get("/orders")
        .send(&service)
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "internal server error");

    // The service keeps answering after the fault.
    TestRequest::get("/orders")
        .send(&service)
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

/// ## Summary
/// A failing firewall rule stops the request with 403 before identity resolution.
#[test_log::test(tokio::test)]
async fn failing_rule_check_is_forbidden() {
    let matcher = prefixed("/internal");
    let rule: Arc<dyn Rule> = Arc::new(ApiKeyHeaderRule::new(
        matcher.clone(),
        "x-internal-key",
        "s3cret",
    ));
    let registry = Builder::new()
        .add_stateless_firewall(
            "internal",
            matcher,
            vec![rule],
            Arc::new(PanickingTokenSource),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, EventDispatcher::new());

    TestRequest::get("/internal/jobs")
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    TestRequest::get("/internal/jobs")
        .header("x-internal-key", "wrong")
        .accept_html()
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_body_contains("Forbidden");
}

/// ## Summary
/// A passing rule check hands over to identity resolution.
#[test_log::test(tokio::test)]
async fn passing_rule_check_resolves_identity() {
    let matcher = prefixed("/internal");
    let rule: Arc<dyn Rule> = Arc::new(ApiKeyHeaderRule::new(
        matcher.clone(),
        "x-internal-key",
        "s3cret",
    ));
    let registry = Builder::new()
        .add_stateless_firewall(
            "internal",
            matcher,
            vec![rule],
            header_token_source(),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, EventDispatcher::new());

    TestRequest::get("/internal/jobs")
        .header("x-internal-key", "s3cret")
        .user("cron", &["ROLE_SYSTEM"])
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body("internal:cron");
}

/// ## Summary
/// Authenticator-backed sources publish login events for successful authentication
/// and stay anonymous for a wrong key.
#[test_log::test(tokio::test)]
async fn api_key_authentication_publishes_login_success() {
    let authenticator = ApiKeyHeaderAuthenticator::new(
        "x-api-key",
        "secret",
        "ops",
        vec!["ROLE_ADMIN".to_string()],
    )
    .expect("authenticator settings are valid");
    let source = AuthenticatorTokenSource::new(AuthenticatorManager::new(vec![
        Arc::new(authenticator) as Arc<dyn Authenticator>,
    ]));
    let (events, recorder) = recording_dispatcher();
    let registry = Builder::new()
        .add_stateless_firewall(
            "api",
            prefixed("/api"),
            Vec::new(),
            Arc::new(source),
            FirewallOverride::new(),
        )
        .compile()
        .expect("configuration should compile");
    let service = create_test_service(registry, events);

    TestRequest::get("/api/status")
        .header("x-api-key", "secret")
        .send(&service)
        .await
        .assert_body("api:ops");
    TestRequest::get("/api/status")
        .header("x-api-key", "guess")
        .send(&service)
        .await
        .assert_body("api:");

    assert_eq!(recorder.names(), [EVENT_LOGIN_SUCCESS]);
    assert!(!recorder.names().contains(&EVENT_LOGIN_FAILURE));
}
