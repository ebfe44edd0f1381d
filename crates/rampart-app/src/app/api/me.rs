use rampart_core::constants::ME_ROUTE_COMPONENT;
use rampart_security::depot::{get_security_context, is_granted};
use salvo::prelude::Json;
use salvo::{Depot, Router, handler};
use serde_json::json;

/// ## Summary
/// Returns the caller's identity as resolved by the firewall that matched the request.
#[handler]
async fn me(depot: &Depot) -> Json<serde_json::Value> {
    let Some(context) = get_security_context(depot) else {
        return Json(json!({"status": "public"}));
    };
    let token = context.token();
    let effective_roles = context
        .firewall()
        .role_hierarchy()
        .map_or_else(|| token.roles().to_vec(), |h| h.expand_roles(token.roles()));

    Json(json!({
        "user": token.user_identifier(),
        "authenticated": token.is_authenticated(),
        "roles": token.roles(),
        "effective_roles": effective_roles,
        "firewall": context.firewall().name(),
        "admin": is_granted(depot, "ROLE_ADMIN"),
    }))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(ME_ROUTE_COMPONENT).get(me)
}
