//! Response-producing capabilities a firewall is configured with.

use salvo::http::header::ACCEPT;
use salvo::http::{HeaderValue, StatusCode};
use salvo::writing::{Json, Text};
use salvo::{Request, Response, async_trait};
use serde::Serialize;

use crate::error::{SecurityError, SecurityResult};
use crate::token::Token;

/// Starts authentication for an anonymous caller hitting a protected path.
pub trait EntryPoint: Send + Sync {
    /// ## Errors
    /// Returns an error when no response could be produced; the error is then routed
    /// through the exception channel.
    fn start(&self, req: &Request, res: &mut Response) -> SecurityResult<()>;
}

/// Produces the response for an authenticated caller that was denied.
pub trait AccessDeniedHandler: Send + Sync {
    /// ## Errors
    /// Returns an error when no response could be produced; a default forbidden
    /// response is written instead.
    fn handle(&self, req: &Request, error: &SecurityError, res: &mut Response)
    -> SecurityResult<()>;
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    /// Identity resolved by the firewall's token source for this request.
    pub token: Token,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: Token,
}

#[derive(Debug, Clone)]
pub struct LogoutInput {
    pub token: Token,
}

/// Completes a login on a stateful firewall.
#[async_trait]
pub trait LoginHandler: Send + Sync {
    /// ## Errors
    /// Returns an error when the login is rejected.
    async fn login(
        &self,
        req: &mut Request,
        res: &mut Response,
        input: LoginInput,
    ) -> SecurityResult<LoginResult>;
}

/// Completes a logout on a stateful firewall.
#[async_trait]
pub trait LogoutHandler: Send + Sync {
    /// ## Errors
    /// Returns an error when the logout fails.
    async fn logout(
        &self,
        req: &mut Request,
        res: &mut Response,
        input: LogoutInput,
    ) -> SecurityResult<()>;
}

/// JSON body of security error responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// ## Summary
/// Whether the client asked for HTML in its `Accept` header.
#[must_use]
pub fn prefers_html(req: &Request) -> bool {
    req.headers()
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// ## Summary
/// Writes `{"error": message}` with `status`.
pub fn render_json_error(res: &mut Response, status: StatusCode, message: &str) {
    res.status_code(status);
    res.render(Json(ErrorResponse {
        error: message.to_owned(),
    }));
}

/// ## Summary
/// Writes the default forbidden response, HTML or JSON depending on the client.
pub fn render_forbidden(req: &Request, res: &mut Response) {
    if prefers_html(req) {
        res.status_code(StatusCode::FORBIDDEN);
        res.render(Text::Html("<h1>Forbidden</h1>"));
    } else {
        render_json_error(res, StatusCode::FORBIDDEN, "forbidden");
    }
}

/// Redirects HTML clients to a login page; API clients get a JSON 401.
#[derive(Debug, Clone)]
pub struct LoginRedirectEntryPoint {
    login_path: String,
}

impl LoginRedirectEntryPoint {
    #[must_use]
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }
}

impl EntryPoint for LoginRedirectEntryPoint {
    fn start(&self, req: &Request, res: &mut Response) -> SecurityResult<()> {
        if !prefers_html(req) {
            render_json_error(res, StatusCode::UNAUTHORIZED, "unauthorized");
            return Ok(());
        }

        let location = HeaderValue::from_str(&self.login_path).map_err(|e| {
            SecurityError::Handler(format!("invalid login path `{}`: {e}", self.login_path))
        })?;
        res.add_header("Location", location, true)
            .map_err(|e| SecurityError::Handler(format!("failed to set redirect: {e}")))?;
        res.status_code(StatusCode::FOUND);
        Ok(())
    }
}

/// Default forbidden response: `<h1>Forbidden</h1>` for HTML clients, JSON otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAccessDeniedHandler;

impl AccessDeniedHandler for DefaultAccessDeniedHandler {
    fn handle(
        &self,
        req: &Request,
        _error: &SecurityError,
        res: &mut Response,
    ) -> SecurityResult<()> {
        render_forbidden(req, res);
        Ok(())
    }
}
