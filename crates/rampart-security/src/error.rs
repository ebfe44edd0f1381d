use salvo::http::StatusCode;
use thiserror::Error;

/// Errors raised by the authorization engine.
///
/// Variants split into two channels: configuration errors surface once at compile time
/// (or from a misconfigured firewall at request time), every other variant is a
/// request-time failure that resolves into a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Invalid security configuration for firewall `{firewall}`: {reason}")]
    FirewallConfiguration { firewall: String, reason: String },

    #[error("Invalid security configuration: {0}")]
    Configuration(String),

    #[error("Request rejected by pre-check rule `{rule}`: {reason}")]
    RuleCheck { rule: String, reason: String },

    #[error("Token source `{source_name}` of firewall `{firewall}` faulted: {message}")]
    ResolutionFault {
        firewall: String,
        source_name: String,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authentication required for attributes [{}]", .attributes.join(", "))]
    Unauthenticated { attributes: Vec<String> },

    #[error("Access denied for attribute `{attribute}`")]
    AccessDenied { attribute: String },

    #[error("Access denied for all attributes [{}]", .attributes.join(", "))]
    AccessDeniedAny { attributes: Vec<String> },

    #[error("No security context available: {reason}")]
    MissingSecurityContext { reason: &'static str },

    #[error("Security handler failed: {0}")]
    Handler(String),
}

impl SecurityError {
    /// ## Summary
    /// HTTP status a request-time occurrence of this error resolves to.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::FirewallConfiguration { .. }
            | Self::Configuration(_)
            | Self::ResolutionFault { .. }
            | Self::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Authentication(_)
            | Self::Unauthenticated { .. }
            | Self::MissingSecurityContext { .. } => StatusCode::UNAUTHORIZED,
            Self::RuleCheck { .. } | Self::AccessDenied { .. } | Self::AccessDeniedAny { .. } => {
                StatusCode::FORBIDDEN
            }
        }
    }

    /// ## Summary
    /// Whether this error belongs to the startup validation channel.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::FirewallConfiguration { .. } | Self::Configuration(_)
        )
    }

    /// ## Summary
    /// Short client-facing message. Never includes internal detail.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        let status = self.status_code();
        if status == StatusCode::UNAUTHORIZED {
            "unauthorized"
        } else if status == StatusCode::FORBIDDEN {
            "forbidden"
        } else {
            "internal server error"
        }
    }

    pub(crate) fn firewall_configuration(
        firewall: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::FirewallConfiguration {
            firewall: firewall.into(),
            reason: reason.into(),
        }
    }
}

pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
