pub mod api;
pub mod auth;

use rampart_core::error::CoreError;
use rampart_security::SecurityListeners;
use salvo::logging::Logger;
use salvo::{Router, async_trait};

use crate::error::{AppError, AppResult};

/// Makes the compiled security setup available to handlers through the depot.
pub struct SecurityHandler {
    pub security: SecurityListeners,
}

#[async_trait]
impl salvo::Handler for SecurityHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.security.clone());
    }
}

/// ## Summary
/// Retrieves the security setup from the depot.
///
/// ## Errors
/// Returns an error if the security setup is not found in the depot.
pub fn get_security_from_depot(depot: &salvo::Depot) -> AppResult<SecurityListeners> {
    depot
        .obtain::<SecurityListeners>()
        .cloned()
        .map_err(|_err| {
            AppError::CoreError(CoreError::InvariantViolation(
                "Security listeners not found in depot",
            ))
        })
}

/// ## Summary
/// The application router: request logging, the security hoops, the API and the login
/// and logout endpoints of every stateful firewall.
#[must_use]
pub fn router(security: &SecurityListeners) -> Router {
    let router = Router::new().hoop(Logger::new()).hoop(SecurityHandler {
        security: security.clone(),
    });

    security
        .attach(router)
        .push(api::routes())
        .push(auth::routes(security))
}
