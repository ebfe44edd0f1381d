//! Security domain events and their dispatch.

mod dispatcher;

use chrono::{DateTime, Utc};
use rampart_core::constants::{
    EVENT_AUTHORIZATION_DENIED, EVENT_AUTHORIZATION_GRANTED, EVENT_LOGIN_FAILURE,
    EVENT_LOGIN_SUCCESS, EVENT_LOGOUT_FAILURE, EVENT_LOGOUT_SUCCESS,
};
use salvo::Request;

use crate::error::SecurityError;
use crate::token::Token;

pub use dispatcher::{EventDispatcher, ExceptionListener, SecurityEventListener};

/// The parts of a request that events carry. Events outlive the request borrow, so they
/// hold a copy rather than the request itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
}

impl From<&Request> for RequestSnapshot {
    fn from(req: &Request) -> Self {
        Self {
            method: req.method().to_string(),
            path: req.uri().path().to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SecurityEvent {
    AuthorizationGranted {
        request: RequestSnapshot,
        attributes: Vec<String>,
        occurred_at: DateTime<Utc>,
    },
    AuthorizationDenied {
        request: RequestSnapshot,
        attributes: Vec<String>,
        error: SecurityError,
        occurred_at: DateTime<Utc>,
    },
    LoginSuccess {
        request: RequestSnapshot,
        firewall: String,
        token: Token,
        occurred_at: DateTime<Utc>,
    },
    LoginFailure {
        request: RequestSnapshot,
        firewall: String,
        error: SecurityError,
        occurred_at: DateTime<Utc>,
    },
    LogoutSuccess {
        request: RequestSnapshot,
        firewall: String,
        token: Token,
        occurred_at: DateTime<Utc>,
    },
    LogoutFailure {
        request: RequestSnapshot,
        firewall: String,
        token: Token,
        error: SecurityError,
        occurred_at: DateTime<Utc>,
    },
}

impl SecurityEvent {
    #[must_use]
    pub fn authorization_granted(request: RequestSnapshot, attributes: Vec<String>) -> Self {
        Self::AuthorizationGranted {
            request,
            attributes,
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn authorization_denied(
        request: RequestSnapshot,
        attributes: Vec<String>,
        error: SecurityError,
    ) -> Self {
        Self::AuthorizationDenied {
            request,
            attributes,
            error,
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn login_success(request: RequestSnapshot, firewall: &str, token: Token) -> Self {
        Self::LoginSuccess {
            request,
            firewall: firewall.to_owned(),
            token,
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn login_failure(request: RequestSnapshot, firewall: &str, error: SecurityError) -> Self {
        Self::LoginFailure {
            request,
            firewall: firewall.to_owned(),
            error,
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn logout_success(request: RequestSnapshot, firewall: &str, token: Token) -> Self {
        Self::LogoutSuccess {
            request,
            firewall: firewall.to_owned(),
            token,
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn logout_failure(
        request: RequestSnapshot,
        firewall: &str,
        token: Token,
        error: SecurityError,
    ) -> Self {
        Self::LogoutFailure {
            request,
            firewall: firewall.to_owned(),
            token,
            error,
            occurred_at: Utc::now(),
        }
    }

    /// ## Summary
    /// Stable event name, e.g. `security.authorization.denied`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AuthorizationGranted { .. } => EVENT_AUTHORIZATION_GRANTED,
            Self::AuthorizationDenied { .. } => EVENT_AUTHORIZATION_DENIED,
            Self::LoginSuccess { .. } => EVENT_LOGIN_SUCCESS,
            Self::LoginFailure { .. } => EVENT_LOGIN_FAILURE,
            Self::LogoutSuccess { .. } => EVENT_LOGOUT_SUCCESS,
            Self::LogoutFailure { .. } => EVENT_LOGOUT_FAILURE,
        }
    }

    #[must_use]
    pub const fn request(&self) -> &RequestSnapshot {
        match self {
            Self::AuthorizationGranted { request, .. }
            | Self::AuthorizationDenied { request, .. }
            | Self::LoginSuccess { request, .. }
            | Self::LoginFailure { request, .. }
            | Self::LogoutSuccess { request, .. }
            | Self::LogoutFailure { request, .. } => request,
        }
    }

    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::AuthorizationGranted { occurred_at, .. }
            | Self::AuthorizationDenied { occurred_at, .. }
            | Self::LoginSuccess { occurred_at, .. }
            | Self::LoginFailure { occurred_at, .. }
            | Self::LogoutSuccess { occurred_at, .. }
            | Self::LogoutFailure { occurred_at, .. } => *occurred_at,
        }
    }

    /// ## Summary
    /// The error carried by failure events.
    #[must_use]
    pub const fn error(&self) -> Option<&SecurityError> {
        match self {
            Self::AuthorizationDenied { error, .. }
            | Self::LoginFailure { error, .. }
            | Self::LogoutFailure { error, .. } => Some(error),
            Self::AuthorizationGranted { .. }
            | Self::LoginSuccess { .. }
            | Self::LogoutSuccess { .. } => None,
        }
    }
}
