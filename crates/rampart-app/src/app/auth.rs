use std::sync::Arc;

use rampart_security::depot::get_security_context;
use rampart_security::event::EventDispatcher;
use rampart_security::handler::{LoginInput, LogoutInput};
use rampart_security::{CompiledFirewall, SecurityListeners, Token};
use salvo::{Router, async_trait};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Login,
    Logout,
}

/// Login or logout endpoint bound to one stateful firewall.
struct AuthEndpoint {
    firewall: Arc<CompiledFirewall>,
    events: Arc<EventDispatcher>,
    action: Action,
}

impl AuthEndpoint {
    /// Identity resolved for this request by the endpoint's own firewall.
    fn token(&self, depot: &salvo::Depot) -> Token {
        get_security_context(depot)
            .filter(|context| context.firewall().name() == self.firewall.name())
            .map_or(Token::Anonymous, |context| context.token().clone())
    }
}

#[async_trait]
impl salvo::Handler for AuthEndpoint {
    #[tracing::instrument(
        skip(self, req, depot, res, _ctrl),
        fields(firewall = %self.firewall.name(), action = ?self.action)
    )]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        let token = self.token(depot);
        let result = match self.action {
            Action::Login => self
                .firewall
                .login(req, res, &self.events, LoginInput { token })
                .await
                .map(|_| ()),
            Action::Logout => {
                self.firewall
                    .logout(req, res, &self.events, LogoutInput { token })
                    .await
            }
        };
        if let Err(error) = result {
            self.events.dispatch_exception(req, &error, res);
        }
    }
}

/// ## Summary
/// `POST` routes for the login and logout paths of every stateful firewall.
#[must_use]
pub fn routes(security: &SecurityListeners) -> Router {
    let mut router = Router::new();
    for firewall in security.registry().firewalls() {
        let endpoints = [
            (firewall.login_path(), Action::Login),
            (firewall.logout_path(), Action::Logout),
        ];
        for (path, action) in endpoints {
            if let Some(path) = path {
                router = router.push(Router::with_path(path).post(AuthEndpoint {
                    firewall: firewall.clone(),
                    events: security.events().clone(),
                    action,
                }));
            }
        }
    }
    router
}
