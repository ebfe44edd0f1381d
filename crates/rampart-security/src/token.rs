/// Identity of the caller for the duration of one request.
///
/// Tokens are values: they are never mutated after construction and are cheap to clone
/// into the security context and into events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Token {
    #[default]
    Anonymous,
    Authenticated(AuthenticatedToken),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedToken {
    user_identifier: String,
    roles: Vec<String>,
}

impl Token {
    /// ## Summary
    /// Builds an authenticated token for `user_identifier` holding `roles`.
    #[must_use]
    pub fn authenticated<I, S>(user_identifier: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Authenticated(AuthenticatedToken {
            user_identifier: user_identifier.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        })
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// ## Summary
    /// The user identifier, empty for anonymous callers.
    #[must_use]
    pub fn user_identifier(&self) -> &str {
        match self {
            Self::Anonymous => "",
            Self::Authenticated(token) => &token.user_identifier,
        }
    }

    /// ## Summary
    /// Roles granted directly to the caller, in the order the identity source produced
    /// them. Anonymous callers hold none.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        match self {
            Self::Anonymous => &[],
            Self::Authenticated(token) => &token.roles,
        }
    }
}
