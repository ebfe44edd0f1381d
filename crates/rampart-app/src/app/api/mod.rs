use rampart_core::constants::API_ROUTE_COMPONENT;
use salvo::Router;

mod admin;
mod health;
mod me;

#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .push(health::routes())
        .push(me::routes())
        .push(admin::routes())
}
