use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use salvo::{Depot, FlowCtrl, Request, Response};

use super::already_responded;
use crate::context::SecurityContext;
use crate::depot::set_security_context;
use crate::error::{SecurityError, SecurityResult};
use crate::event::EventDispatcher;
use crate::firewall::{CompiledFirewall, FirewallRegistry};
use crate::source::ResolutionContext;
use crate::token::Token;

/// ## Summary
/// First authorization hoop: matches a firewall, runs its pre-check rules, resolves the
/// caller's identity and publishes the [`SecurityContext`].
///
/// ## Side Effects
/// Inserts the security context into the depot for every request a firewall matches,
/// anonymous when rules or resolution fail.
///
/// ## Errors
/// Rule and resolution failures are routed through the exception channel and stop the
/// rest of the chain.
pub struct FirewallListener {
    pub(super) registry: Arc<FirewallRegistry>,
    pub(super) events: Arc<EventDispatcher>,
}

#[salvo::async_trait]
impl salvo::Handler for FirewallListener {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        if already_responded(res, ctrl) {
            tracing::trace!("Response already produced, skipping firewall resolution");
            return;
        }

        let Some(firewall) = self.registry.match_request(req).cloned() else {
            tracing::trace!("No firewall matched");
            return;
        };
        tracing::trace!(firewall = %firewall.name(), "Firewall matched");

        if let Err(error) = firewall.rules().check(req) {
            tracing::warn!(firewall = %firewall.name(), error = %error, "Pre-check rule rejected request");
            set_security_context(depot, SecurityContext::new(firewall, Token::Anonymous));
            self.events.dispatch_exception(req, &error, res);
            ctrl.skip_rest();
            return;
        }

        match resolve_guarded(&firewall, req, &self.events).await {
            Ok(token) => {
                let token = token.unwrap_or_default();
                tracing::debug!(
                    firewall = %firewall.name(),
                    authenticated = token.is_authenticated(),
                    user = %token.user_identifier(),
                    "Identity resolved"
                );
                set_security_context(depot, SecurityContext::new(firewall, token));
            }
            Err(error) => {
                tracing::error!(firewall = %firewall.name(), error = %error, "Identity resolution failed");
                set_security_context(depot, SecurityContext::new(firewall, Token::Anonymous));
                self.events.dispatch_exception(req, &error, res);
                ctrl.skip_rest();
            }
        }
    }
}

/// ## Summary
/// Runs the firewall's token source, turning a panic into a resolution fault naming the
/// firewall and the source.
///
/// ## Errors
/// Returns the source's own error, or [`SecurityError::ResolutionFault`] when it panicked.
async fn resolve_guarded(
    firewall: &CompiledFirewall,
    req: &mut Request,
    events: &EventDispatcher,
) -> SecurityResult<Option<Token>> {
    let source = firewall.token_source();
    let ctx = ResolutionContext {
        firewall: firewall.name(),
        events,
    };

    match AssertUnwindSafe(source.resolve(req, ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(SecurityError::ResolutionFault {
            firewall: firewall.name().to_owned(),
            source_name: source.name().to_owned(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
