use std::sync::Arc;

use salvo::{Request, Response};

use super::SecurityEvent;
use crate::error::SecurityError;

/// Receives published security events.
pub trait SecurityEventListener: Send + Sync {
    fn on_event(&self, event: &SecurityEvent);
}

impl<F> SecurityEventListener for F
where
    F: Fn(&SecurityEvent) + Send + Sync,
{
    fn on_event(&self, event: &SecurityEvent) {
        self(event);
    }
}

/// Turns a request-time security error into a response.
pub trait ExceptionListener: Send + Sync {
    /// ## Summary
    /// Returns `true` once a response for `error` has been written. Listeners that do
    /// not handle the error return `false` and leave `res` untouched.
    fn on_exception(&self, req: &Request, error: &SecurityError, res: &mut Response) -> bool;
}

/// Priority-ordered event and exception channels. Higher priorities run first; equal
/// priorities keep registration order.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Vec<(i32, Arc<dyn SecurityEventListener>)>,
    exception_listeners: Vec<(i32, Arc<dyn ExceptionListener>)>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(
        &mut self,
        priority: i32,
        listener: Arc<dyn SecurityEventListener>,
    ) -> &mut Self {
        let position = self
            .listeners
            .iter()
            .position(|(p, _)| *p < priority)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(position, (priority, listener));
        self
    }

    pub fn add_exception_listener(
        &mut self,
        priority: i32,
        listener: Arc<dyn ExceptionListener>,
    ) -> &mut Self {
        let position = self
            .exception_listeners
            .iter()
            .position(|(p, _)| *p < priority)
            .unwrap_or(self.exception_listeners.len());
        self.exception_listeners
            .insert(position, (priority, listener));
        self
    }

    pub fn dispatch(&self, event: &SecurityEvent) {
        tracing::debug!(
            event = event.name(),
            method = %event.request().method,
            path = %event.request().path,
            "Dispatching security event"
        );
        for (_, listener) in &self.listeners {
            listener.on_event(event);
        }
    }

    /// ## Summary
    /// Offers `error` to the exception listeners in priority order. When none handles
    /// it, a plain-text response carrying the error's status is written.
    pub fn dispatch_exception(&self, req: &Request, error: &SecurityError, res: &mut Response) {
        for (_, listener) in &self.exception_listeners {
            if listener.on_exception(req, error, res) {
                return;
            }
        }
        tracing::debug!(error = %error, "No exception listener handled error, using fallback");
        res.status_code(error.status_code());
        res.render(error.public_message());
    }
}
