//! Login and logout handlers for stateful firewalls.
//!
//! Credentials are checked by the firewall's token source before the endpoint runs; the
//! handlers accept the resolved identity and report it back to the client.

use rampart_security::handler::{
    LoginHandler, LoginInput, LoginResult, LogoutHandler, LogoutInput,
};
use rampart_security::{SecurityError, SecurityResult};
use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Request, Response, async_trait};
use serde_json::json;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenLoginHandler;

#[async_trait]
impl LoginHandler for TokenLoginHandler {
    async fn login(
        &self,
        _req: &mut Request,
        res: &mut Response,
        input: LoginInput,
    ) -> SecurityResult<LoginResult> {
        if !input.token.is_authenticated() {
            return Err(SecurityError::Authentication(
                "no credentials presented".to_string(),
            ));
        }
        res.status_code(StatusCode::OK);
        res.render(Json(json!({
            "user": input.token.user_identifier(),
            "roles": input.token.roles(),
        })));
        Ok(LoginResult { token: input.token })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenLogoutHandler;

#[async_trait]
impl LogoutHandler for TokenLogoutHandler {
    async fn logout(
        &self,
        _req: &mut Request,
        res: &mut Response,
        input: LogoutInput,
    ) -> SecurityResult<()> {
        if !input.token.is_authenticated() {
            return Err(SecurityError::Authentication("not logged in".to_string()));
        }
        res.status_code(StatusCode::NO_CONTENT);
        Ok(())
    }
}
