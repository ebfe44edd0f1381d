use std::sync::Arc;

use salvo::{Request, async_trait};

use super::{ResolutionContext, TokenSource};
use crate::error::{SecurityError, SecurityResult};
use crate::event::{RequestSnapshot, SecurityEvent};
use crate::token::Token;

/// Authenticates requests carrying one kind of credential.
#[async_trait]
pub trait Authenticator: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the request carries a credential this authenticator understands.
    fn supports(&self, req: &Request) -> bool;

    /// ## Errors
    /// Returns an error when the credential is present but cannot be verified.
    async fn authenticate(&self, req: &mut Request) -> SecurityResult<Token>;
}

/// Outcome of running the authenticator chain on a request.
#[derive(Debug)]
pub enum Authentication {
    /// No authenticator supported the request.
    NotAttempted,
    Attempted {
        authenticator: String,
        result: SecurityResult<Token>,
    },
}

/// Ordered authenticators; the first supporting one authenticates the request.
#[derive(Clone, Default)]
pub struct AuthenticatorManager {
    authenticators: Vec<Arc<dyn Authenticator>>,
}

impl AuthenticatorManager {
    #[must_use]
    pub fn new(authenticators: Vec<Arc<dyn Authenticator>>) -> Self {
        Self { authenticators }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }

    pub async fn authenticate(&self, req: &mut Request) -> Authentication {
        let Some(authenticator) = self.authenticators.iter().find(|a| a.supports(req)) else {
            return Authentication::NotAttempted;
        };
        tracing::trace!(authenticator = authenticator.name(), "Authenticator selected");
        Authentication::Attempted {
            authenticator: authenticator.name().to_owned(),
            result: authenticator.authenticate(req).await,
        }
    }
}

/// Token source running an [`AuthenticatorManager`] and publishing login events.
#[derive(Clone, Default)]
pub struct AuthenticatorTokenSource {
    manager: AuthenticatorManager,
}

impl AuthenticatorTokenSource {
    pub const NAME: &'static str = "authenticatorManager";

    #[must_use]
    pub const fn new(manager: AuthenticatorManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl TokenSource for AuthenticatorTokenSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn resolve(
        &self,
        req: &mut Request,
        ctx: ResolutionContext<'_>,
    ) -> SecurityResult<Option<Token>> {
        let snapshot = RequestSnapshot::from(&*req);
        match self.manager.authenticate(req).await {
            Authentication::NotAttempted => Ok(Some(Token::Anonymous)),
            Authentication::Attempted {
                authenticator,
                result: Ok(token),
            } => {
                if token.is_authenticated() {
                    tracing::debug!(
                        firewall = %ctx.firewall,
                        authenticator = %authenticator,
                        user = %token.user_identifier(),
                        "Authentication succeeded"
                    );
                    ctx.events.dispatch(&SecurityEvent::login_success(
                        snapshot,
                        ctx.firewall,
                        token.clone(),
                    ));
                }
                Ok(Some(token))
            }
            Authentication::Attempted {
                authenticator,
                result: Err(error),
            } => {
                tracing::warn!(
                    firewall = %ctx.firewall,
                    authenticator = %authenticator,
                    error = %error,
                    "Authentication failed"
                );
                ctx.events.dispatch(&SecurityEvent::login_failure(
                    snapshot,
                    ctx.firewall,
                    error.clone(),
                ));
                Err(error)
            }
        }
    }
}

/// Authenticates requests presenting a fixed API key in a header.
///
/// Requests carrying the header with a different value stay anonymous.
#[derive(Debug, Clone)]
pub struct ApiKeyHeaderAuthenticator {
    header: String,
    expected: String,
    user_identifier: String,
    roles: Vec<String>,
}

impl ApiKeyHeaderAuthenticator {
    /// ## Errors
    /// Returns a configuration error when the header name or expected key is empty.
    pub fn new(
        header: impl Into<String>,
        expected: impl Into<String>,
        user_identifier: impl Into<String>,
        roles: Vec<String>,
    ) -> SecurityResult<Self> {
        let header = header.into();
        let expected = expected.into();
        if header.trim().is_empty() {
            return Err(SecurityError::Configuration(
                "API key header name must not be empty".to_string(),
            ));
        }
        if expected.is_empty() {
            return Err(SecurityError::Configuration(
                "API key value must not be empty".to_string(),
            ));
        }
        Ok(Self {
            header,
            expected,
            user_identifier: user_identifier.into(),
            roles,
        })
    }

    fn presented<'a>(&self, req: &'a Request) -> Option<&'a str> {
        req.headers()
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl Authenticator for ApiKeyHeaderAuthenticator {
    fn name(&self) -> &str {
        "api_key_header"
    }

    fn supports(&self, req: &Request) -> bool {
        self.presented(req).is_some()
    }

    async fn authenticate(&self, req: &mut Request) -> SecurityResult<Token> {
        if self.presented(req) == Some(self.expected.as_str()) {
            Ok(Token::authenticated(
                self.user_identifier.clone(),
                self.roles.clone(),
            ))
        } else {
            Ok(Token::Anonymous)
        }
    }
}
