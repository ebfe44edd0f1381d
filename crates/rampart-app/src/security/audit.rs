use rampart_security::event::{SecurityEvent, SecurityEventListener};

/// Priority of [`AuditListener`]; it runs after listeners registered at higher priorities.
pub const AUDIT_LISTENER_PRIORITY: i32 = -1024;

/// Writes every security event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditListener;

impl SecurityEventListener for AuditListener {
    fn on_event(&self, event: &SecurityEvent) {
        let request = event.request();
        match event.error() {
            Some(error) => tracing::warn!(
                event = event.name(),
                method = %request.method,
                path = %request.path,
                occurred_at = %event.occurred_at(),
                error = %error,
                "Security event"
            ),
            None => tracing::info!(
                event = event.name(),
                method = %request.method,
                path = %request.path,
                occurred_at = %event.occurred_at(),
                "Security event"
            ),
        }
    }
}
