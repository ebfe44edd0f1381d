//! Salvo hoops wiring the engine into the request pipeline.

mod access_control;
mod resolution;

use std::sync::Arc;

use salvo::http::StatusCode;
use salvo::{FlowCtrl, Request, Response, Router};

use crate::error::SecurityError;
use crate::event::{EventDispatcher, ExceptionListener};
use crate::firewall::FirewallRegistry;
use crate::handler::{render_forbidden, render_json_error};

pub use access_control::AccessControlListener;
pub use resolution::FirewallListener;

/// Priority of [`SecurityExceptionListener`]; ahead of application exception listeners
/// registered at the default priority.
pub const SECURITY_EXCEPTION_PRIORITY: i32 = 2048;

fn already_responded(res: &Response, ctrl: &FlowCtrl) -> bool {
    ctrl.is_ceased() || res.status_code.is_some()
}

/// Renders security errors: forbidden-class errors as the default forbidden page or JSON,
/// everything else as a JSON error carrying the error's status.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityExceptionListener;

impl ExceptionListener for SecurityExceptionListener {
    fn on_exception(&self, req: &Request, error: &SecurityError, res: &mut Response) -> bool {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!(error = %error, status = %status, "Security error");
        } else {
            tracing::debug!(error = %error, status = %status, "Security error");
        }

        if status == StatusCode::FORBIDDEN {
            render_forbidden(req, res);
        } else {
            render_json_error(res, status, error.public_message());
        }
        true
    }
}

/// The compiled registry and dispatcher, registered with the request pipeline.
#[derive(Clone)]
pub struct SecurityListeners {
    registry: Arc<FirewallRegistry>,
    events: Arc<EventDispatcher>,
}

impl SecurityListeners {
    /// ## Summary
    /// Registers the security exception listener on `events` and freezes both.
    #[must_use]
    pub fn register(registry: FirewallRegistry, mut events: EventDispatcher) -> Self {
        events.add_exception_listener(
            SECURITY_EXCEPTION_PRIORITY,
            Arc::new(SecurityExceptionListener),
        );
        Self {
            registry: Arc::new(registry),
            events: Arc::new(events),
        }
    }

    /// ## Summary
    /// Adds the firewall and access-control hoops to `router`, ahead of its handlers.
    #[must_use]
    pub fn attach(&self, router: Router) -> Router {
        router
            .hoop(self.firewall_listener())
            .hoop(self.access_control_listener())
    }

    #[must_use]
    pub fn firewall_listener(&self) -> FirewallListener {
        FirewallListener {
            registry: self.registry.clone(),
            events: self.events.clone(),
        }
    }

    #[must_use]
    pub fn access_control_listener(&self) -> AccessControlListener {
        AccessControlListener {
            registry: self.registry.clone(),
            events: self.events.clone(),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<FirewallRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }
}
