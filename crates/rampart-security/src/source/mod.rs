//! Identity sources: how a firewall turns a request into a [`Token`].

mod authenticator;

use salvo::{Request, async_trait};

use crate::error::SecurityResult;
use crate::event::EventDispatcher;
use crate::token::Token;

pub use authenticator::{
    ApiKeyHeaderAuthenticator, Authentication, Authenticator, AuthenticatorManager,
    AuthenticatorTokenSource,
};

/// What a token source knows about the resolution in progress.
#[derive(Clone, Copy)]
pub struct ResolutionContext<'a> {
    /// Name of the firewall that matched the request.
    pub firewall: &'a str,
    pub events: &'a EventDispatcher,
}

/// Resolves the identity of a request.
///
/// Sources may call out to external stores and may publish login events through the
/// context's dispatcher. A panic inside `resolve` is caught by the request listener and
/// reported as a resolution fault.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Name used in logs and resolution-fault errors.
    fn name(&self) -> &str;

    /// ## Summary
    /// `Ok(None)` means "no identity"; the caller continues as anonymous.
    ///
    /// ## Errors
    /// Returns an error when resolution itself failed, e.g. invalid credentials.
    async fn resolve(
        &self,
        req: &mut Request,
        ctx: ResolutionContext<'_>,
    ) -> SecurityResult<Option<Token>>;
}

type Resolver = dyn Fn(&Request) -> Option<Token> + Send + Sync;

/// Token source backed by a synchronous closure.
pub struct ResolverTokenSource {
    resolver: Box<Resolver>,
}

impl ResolverTokenSource {
    pub const NAME: &'static str = "tokenResolver";

    pub fn new<F>(resolver: F) -> Self
    where
        F: Fn(&Request) -> Option<Token> + Send + Sync + 'static,
    {
        Self {
            resolver: Box::new(resolver),
        }
    }

    /// ## Summary
    /// A source that never resolves an identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(|_| None)
    }
}

#[async_trait]
impl TokenSource for ResolverTokenSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn resolve(
        &self,
        req: &mut Request,
        _ctx: ResolutionContext<'_>,
    ) -> SecurityResult<Option<Token>> {
        Ok((self.resolver)(&*req))
    }
}
