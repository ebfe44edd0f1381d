use rampart_core::constants::HEALTH_ROUTE_COMPONENT;
use salvo::{Router, handler};

#[handler]
async fn health() -> &'static str {
    "OK"
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(HEALTH_ROUTE_COMPONENT).get(health)
}
