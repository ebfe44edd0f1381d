use rampart_core::constants::ADMIN_ROUTE_COMPONENT;
use rampart_security::CompiledFirewall;
use rampart_security::handler::render_json_error;
use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Response, Router, handler};
use serde_json::json;

use crate::app::get_security_from_depot;

fn describe(firewall: &CompiledFirewall) -> serde_json::Value {
    let sources = firewall.sources();
    let access_control: Vec<_> = firewall
        .access_control()
        .rules()
        .iter()
        .map(|rule| json!({"path": rule.path_prefix(), "attributes": rule.attributes()}))
        .collect();

    json!({
        "name": firewall.name(),
        "matcher": firewall.matcher_description(),
        "stateless": firewall.is_stateless(),
        "token_source": firewall.token_source().name(),
        "login_path": firewall.login_path(),
        "logout_path": firewall.logout_path(),
        "access_control": access_control,
        "sources": {
            "role_hierarchy": sources.role_hierarchy.to_string(),
            "decision_manager": sources.decision_manager.to_string(),
            "access_control": sources.access_control.to_string(),
            "entry_point": sources.entry_point.to_string(),
            "access_denied_handler": sources.access_denied_handler.to_string(),
        },
    })
}

/// ## Summary
/// Lists the compiled firewalls in matching order with the provenance of their settings.
#[handler]
async fn list_firewalls(depot: &Depot, res: &mut Response) {
    match get_security_from_depot(depot) {
        Ok(security) => {
            let firewalls: Vec<_> = security
                .registry()
                .firewalls()
                .iter()
                .map(|firewall| describe(firewall))
                .collect();
            res.render(Json(json!({ "firewalls": firewalls })));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list firewalls");
            render_json_error(
                res,
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            );
        }
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(ADMIN_ROUTE_COMPONENT)
        .push(Router::with_path("firewalls").get(list_firewalls))
}
