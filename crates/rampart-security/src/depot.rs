//! Depot helpers for the per-request [`SecurityContext`].

use salvo::Depot;

use crate::context::SecurityContext;

pub mod depot_keys {
    pub const SECURITY_CONTEXT: &str = "__security_context";
}

pub fn set_security_context(depot: &mut Depot, context: SecurityContext) {
    depot.insert(depot_keys::SECURITY_CONTEXT, context);
}

/// Get the security context published for this request, if any.
#[must_use]
pub fn get_security_context(depot: &Depot) -> Option<&SecurityContext> {
    depot
        .get::<SecurityContext>(depot_keys::SECURITY_CONTEXT)
        .ok()
}

pub fn get_security_context_mut(depot: &mut Depot) -> Option<&mut SecurityContext> {
    depot
        .get_mut::<SecurityContext>(depot_keys::SECURITY_CONTEXT)
        .ok()
}

/// ## Summary
/// Whether the current caller holds `role` after hierarchy expansion. Requests without a
/// security context hold no roles.
#[must_use]
pub fn is_granted(depot: &Depot, role: &str) -> bool {
    get_security_context(depot).is_some_and(|context| context.is_granted(role))
}
