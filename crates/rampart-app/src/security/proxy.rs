use std::collections::HashMap;

use rampart_core::config::ProxyAuthSettings;
use rampart_security::source::Authenticator;
use rampart_security::{SecurityError, SecurityResult, Token};
use salvo::{Request, async_trait};

/// Trusts a header set by an upstream proxy naming the authenticated user.
///
/// Users missing from the configured table are rejected rather than treated as anonymous.
#[derive(Debug, Clone)]
pub struct ProxyHeaderAuthenticator {
    header: String,
    users: HashMap<String, Vec<String>>,
}

impl ProxyHeaderAuthenticator {
    #[must_use]
    pub fn new(header: impl Into<String>, users: HashMap<String, Vec<String>>) -> Self {
        Self {
            header: header.into(),
            users,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &ProxyAuthSettings) -> Self {
        Self::new(
            settings.header.clone(),
            settings
                .users
                .iter()
                .map(|user| (user.name.clone(), user.roles.clone()))
                .collect(),
        )
    }

    fn presented<'a>(&self, req: &'a Request) -> Option<&'a str> {
        req.headers()
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl Authenticator for ProxyHeaderAuthenticator {
    fn name(&self) -> &str {
        "proxy_header"
    }

    fn supports(&self, req: &Request) -> bool {
        self.presented(req).is_some()
    }

    async fn authenticate(&self, req: &mut Request) -> SecurityResult<Token> {
        let Some(user) = self.presented(req) else {
            return Ok(Token::Anonymous);
        };
        match self.users.get(user) {
            Some(roles) => Ok(Token::authenticated(user, roles.clone())),
            None => Err(SecurityError::Authentication(format!(
                "unknown proxy user `{user}`"
            ))),
        }
    }
}
