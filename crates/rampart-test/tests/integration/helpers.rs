#![allow(clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Building a salvo test service around a compiled firewall registry
//! - Making HTTP requests and asserting on responses
//! - Recording security events and counting decision-manager calls

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use salvo::http::header::HeaderName;
use salvo::http::{Method, StatusCode};
use salvo::prelude::*;
use salvo::test::{ResponseExt, TestClient};

use rampart_test::component::depot::get_security_context;
use rampart_test::component::event::{EventDispatcher, SecurityEvent, SecurityEventListener};
use rampart_test::component::source::{ResolutionContext, ResolverTokenSource, TokenSource};
use rampart_test::component::voter::{RoleVoter, Voter};

pub use rampart_test::component::*;

/// Echoes the resolved firewall and user, or `no-context`.
#[handler]
async fn echo(depot: &Depot) -> String {
    get_security_context(depot).map_or_else(
        || "no-context".to_string(),
        |context| {
            format!(
                "{}:{}",
                context.firewall().name(),
                context.token().user_identifier()
            )
        },
    )
}

fn catch_all() -> Router {
    Router::with_path("{**rest}").get(echo).post(echo)
}

/// ## Summary
/// Registers the listeners and serves every path with the echo handler behind both
/// security hoops.
#[must_use]
pub fn create_test_service(registry: FirewallRegistry, events: EventDispatcher) -> Service {
    let security = SecurityListeners::register(registry, events);
    Service::new(security.attach(Router::new()).push(catch_all()))
}

/// ## Summary
/// Like [`create_test_service`] but without the firewall hoop, so no request ever has
/// a security context.
#[must_use]
pub fn create_access_control_only_service(
    registry: FirewallRegistry,
    events: EventDispatcher,
) -> Service {
    let security = SecurityListeners::register(registry, events);
    Service::new(
        Router::new()
            .hoop(security.access_control_listener())
            .push(catch_all()),
    )
}

/// ## Summary
/// Resolves `x-user` and comma-separated `x-roles` headers into a token.
#[must_use]
pub fn header_token_source() -> Arc<dyn TokenSource> {
    Arc::new(ResolverTokenSource::new(|req| {
        let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
        let user = header("x-user")?;
        let roles = header("x-roles")
            .map(|roles| roles.split(',').map(str::trim).collect::<Vec<_>>())
            .unwrap_or_default();
        Some(Token::authenticated(user, roles))
    }))
}

/// Voter-based manager with a single role voter.
#[must_use]
pub fn role_manager(strategy: DecisionStrategy) -> AccessDecisionManager {
    AccessDecisionManager::new(strategy, vec![Arc::new(RoleVoter::new()) as Arc<dyn Voter>])
}

/// Records every dispatched security event.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<SecurityEvent>>,
}

impl SecurityEventListener for RecordingListener {
    fn on_event(&self, event: &SecurityEvent) {
        self.events
            .lock()
            .expect("recording lock")
            .push(event.clone());
    }
}

impl RecordingListener {
    #[must_use]
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().expect("recording lock").clone()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(SecurityEvent::name).collect()
    }
}

/// A dispatcher with a [`RecordingListener`] attached.
#[must_use]
pub fn recording_dispatcher() -> (EventDispatcher, Arc<RecordingListener>) {
    let recorder = Arc::new(RecordingListener::default());
    let mut events = EventDispatcher::new();
    events.add_listener(0, recorder.clone());
    (events, recorder)
}

/// Decision manager that counts how often it is asked.
pub struct CountingDecisionManager {
    inner: AccessDecisionManager,
    calls: AtomicUsize,
}

impl CountingDecisionManager {
    #[must_use]
    pub fn new(inner: AccessDecisionManager) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DecisionManager for CountingDecisionManager {
    fn decide_all(
        &self,
        token: &Token,
        attributes: &[String],
        subject: Option<&dyn Any>,
    ) -> SecurityResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decide_all(token, attributes, subject)
    }

    fn decide_any(
        &self,
        token: &Token,
        attributes: &[String],
        subject: Option<&dyn Any>,
    ) -> SecurityResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decide_any(token, attributes, subject)
    }
}

/// Token source whose backing store blows up.
pub struct PanickingTokenSource;

#[async_trait]
impl TokenSource for PanickingTokenSource {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn resolve(
        &self,
        _req: &mut Request,
        _ctx: ResolutionContext<'_>,
    ) -> SecurityResult<Option<Token>> {
        panic!("identity store unavailable");
    }
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
}

impl TestRequest {
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets `x-user` and `x-roles` for [`header_token_source`].
    #[must_use]
    pub fn user(self, user: &str, roles: &[&str]) -> Self {
        self.header("x-user", user)
            .header("x-roles", &roles.join(","))
    }

    #[must_use]
    pub fn accept_html(self) -> Self {
        self.header("Accept", "text/html,application/xhtml+xml")
    }

    /// Sends the request to the test service and returns the response. Methods other
    /// than `POST` are sent as `GET`.
    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{}", self.path);

        let mut client = if self.method == Method::POST {
            TestClient::post(&url)
        } else {
            TestClient::get(&url)
        };

        for (name, value) in self.headers {
            if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
                client = client.add_header(header_name, value, true);
            }
        }

        let mut response = client.send(service).await;

        let status = response.status_code.unwrap_or(StatusCode::OK);

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body = response.take_string().await.unwrap_or_default();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Represents an HTTP test response for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl TestResponse {
    /// Asserts that the response status matches the expected code.
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status, expected,
            "Expected status {expected} but got {}: {}",
            self.status, self.body
        );
        self
    }

    #[must_use]
    pub fn assert_header(self, name: &str, expected: &str) -> Self {
        assert_eq!(
            self.get_header(name),
            Some(expected),
            "Expected header {name} to be {expected}"
        );
        self
    }

    #[must_use]
    pub fn assert_body(self, expected: &str) -> Self {
        assert_eq!(self.body, expected);
        self
    }

    #[must_use]
    pub fn assert_body_contains(self, expected: &str) -> Self {
        assert!(
            self.body.contains(expected),
            "Expected body to contain {expected:?}, got {:?}",
            self.body
        );
        self
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body should be JSON")
    }
}
