use std::any::Any;
use std::sync::Arc;

use salvo::{Depot, FlowCtrl, Request, Response};

use super::already_responded;
use crate::access_control::{AccessControl, PUBLIC_ACCESS};
use crate::context::MatchedAccessControlRule;
use crate::depot::get_security_context_mut;
use crate::error::SecurityError;
use crate::event::{EventDispatcher, RequestSnapshot, SecurityEvent};
use crate::firewall::{CompiledFirewall, FirewallRegistry};
use crate::handler::{render_forbidden, render_json_error};

/// Result of evaluating the access-control phase for one request.
#[derive(Debug)]
enum Outcome {
    /// No rule matched.
    Unguarded,
    /// A rule without attributes matched.
    Public,
    /// A rule carrying [`PUBLIC_ACCESS`] matched.
    PublicAccess { attributes: Vec<String> },
    Granted { attributes: Vec<String> },
    Denied {
        attributes: Vec<String>,
        error: SecurityError,
        firewall: Arc<CompiledFirewall>,
    },
    Unauthenticated {
        attributes: Vec<String>,
        firewall: Arc<CompiledFirewall>,
    },
    MissingContext {
        attributes: Vec<String>,
        reason: &'static str,
    },
    MissingDecisionManager { firewall: Arc<CompiledFirewall> },
}

/// ## Summary
/// Second authorization hoop: matches the effective access control against the request
/// path and decides the required attributes for the resolved token.
///
/// Fails closed: nothing is allowed without an explicit grant, a rule without
/// attributes, or no rule matching at all.
///
/// ## Errors
/// Denials short-circuit the chain with the firewall's entry point (anonymous callers),
/// its access-denied handler (authenticated callers), or a 401 when no security context
/// exists for a protected path.
pub struct AccessControlListener {
    pub(super) registry: Arc<FirewallRegistry>,
    pub(super) events: Arc<EventDispatcher>,
}

#[salvo::async_trait]
impl salvo::Handler for AccessControlListener {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        if already_responded(res, ctrl) {
            tracing::trace!("Response already produced, skipping access control");
            return;
        }

        let outcome = self.evaluate(req, depot);
        let snapshot = RequestSnapshot::from(&*req);

        match outcome {
            Outcome::Unguarded => tracing::trace!("No access-control rule matched"),
            Outcome::Public => tracing::trace!("Public access-control rule matched"),
            Outcome::PublicAccess { attributes } | Outcome::Granted { attributes } => {
                tracing::debug!(attributes = ?attributes, "Access granted");
                self.events
                    .dispatch(&SecurityEvent::authorization_granted(snapshot, attributes));
            }
            Outcome::MissingContext { attributes, reason } => {
                let error = SecurityError::MissingSecurityContext { reason };
                tracing::warn!(error = %error, "Access denied without security context");
                self.events.dispatch(&SecurityEvent::authorization_denied(
                    snapshot,
                    attributes,
                    error.clone(),
                ));
                render_json_error(res, error.status_code(), error.public_message());
                ctrl.skip_rest();
            }
            Outcome::Unauthenticated {
                attributes,
                firewall,
            } => {
                self.start_authentication(req, res, snapshot, attributes, &firewall);
                ctrl.skip_rest();
            }
            Outcome::Denied {
                attributes,
                error,
                firewall,
            } => {
                self.deny(req, res, snapshot, attributes, &error, &firewall);
                ctrl.skip_rest();
            }
            Outcome::MissingDecisionManager { firewall } => {
                let error = SecurityError::firewall_configuration(
                    firewall.name(),
                    "rule requires attributes but no decision manager is configured",
                );
                tracing::error!(error = %error, "Cannot decide access");
                self.events.dispatch_exception(req, &error, res);
                ctrl.skip_rest();
            }
        }
    }
}

impl AccessControlListener {
    /// Anonymous caller on a protected path: the entry point responds, or the exception
    /// channel when the firewall has none.
    fn start_authentication(
        &self,
        req: &Request,
        res: &mut Response,
        snapshot: RequestSnapshot,
        attributes: Vec<String>,
        firewall: &CompiledFirewall,
    ) {
        let error = SecurityError::Unauthenticated {
            attributes: attributes.clone(),
        };
        tracing::debug!(firewall = %firewall.name(), error = %error, "Authentication required");
        self.events.dispatch(&SecurityEvent::authorization_denied(
            snapshot,
            attributes,
            error.clone(),
        ));

        match firewall.entry_point() {
            Some(entry_point) => {
                match entry_point.start(req, res) {
                    Ok(()) if res.status_code.is_none() => {
                        tracing::error!(
                            firewall = %firewall.name(),
                            "Entry point wrote no response"
                        );
                        self.events.dispatch_exception(req, &error, res);
                    }
                    Ok(()) => {}
                    Err(entry_error) => {
                        tracing::error!(error = %entry_error, "Entry point failed");
                        self.events.dispatch_exception(req, &entry_error, res);
                    }
                }
            }
            None => self.events.dispatch_exception(req, &error, res),
        }
    }

    /// Authenticated caller denied by the decision manager.
    fn deny(
        &self,
        req: &Request,
        res: &mut Response,
        snapshot: RequestSnapshot,
        attributes: Vec<String>,
        error: &SecurityError,
        firewall: &CompiledFirewall,
    ) {
        tracing::warn!(firewall = %firewall.name(), error = %error, "Access denied");
        self.events.dispatch(&SecurityEvent::authorization_denied(
            snapshot,
            attributes,
            error.clone(),
        ));

        match firewall.access_denied_handler() {
            Some(handler) => {
                match handler.handle(req, error, res) {
                    Ok(()) if res.status_code.is_none() => {
                        tracing::error!(
                            firewall = %firewall.name(),
                            "Access-denied handler wrote no response"
                        );
                        render_forbidden(req, res);
                    }
                    Ok(()) => {}
                    Err(handler_error) => {
                        tracing::error!(error = %handler_error, "Access-denied handler failed");
                        render_forbidden(req, res);
                    }
                }
            }
            None => render_forbidden(req, res),
        }
    }

    fn evaluate(&self, req: &Request, depot: &mut Depot) -> Outcome {
        let Some(context) = get_security_context_mut(depot) else {
            return self.evaluate_without_context(req);
        };
        let firewall = context.firewall().clone();

        let Some((rule_index, rule)) = firewall.access_control().match_rule(req.uri().path())
        else {
            return Outcome::Unguarded;
        };
        context.set_matched_rule(MatchedAccessControlRule {
            path_prefix: rule.path_prefix().to_owned(),
            attributes: rule.attributes().to_vec(),
            source: firewall.sources().access_control,
            rule_index,
            firewall: firewall.name().to_owned(),
        });

        let attributes = rule.attributes().to_vec();
        if attributes.is_empty() {
            return Outcome::Public;
        }
        if attributes.iter().any(|a| a == PUBLIC_ACCESS) {
            return Outcome::PublicAccess { attributes };
        }

        let token = context.token();
        if !token.is_authenticated() {
            return Outcome::Unauthenticated {
                attributes,
                firewall,
            };
        }
        let Some(manager) = firewall.decision_manager() else {
            return Outcome::MissingDecisionManager { firewall };
        };

        match manager.decide_all(token, &attributes, Some(req as &dyn Any)) {
            Ok(()) => Outcome::Granted { attributes },
            Err(error) => Outcome::Denied {
                attributes,
                error,
                firewall,
            },
        }
    }

    /// No firewall resolved a context. A firewall that matches anyway means the
    /// resolution hoop did not run; otherwise the global access control decides.
    fn evaluate_without_context(&self, req: &Request) -> Outcome {
        if self.registry.match_request(req).is_some() {
            return Outcome::MissingContext {
                attributes: Vec::new(),
                reason: "firewall matched but no identity was resolved",
            };
        }
        evaluate_global(self.registry.global_access_control(), req.uri().path())
    }
}

fn evaluate_global(access_control: &AccessControl, path: &str) -> Outcome {
    let Some(attributes) = access_control.match_path(path) else {
        return Outcome::Unguarded;
    };
    if attributes.is_empty() {
        return Outcome::Public;
    }
    let attributes = attributes.to_vec();
    if attributes.iter().any(|a| a == PUBLIC_ACCESS) {
        Outcome::PublicAccess { attributes }
    } else {
        Outcome::MissingContext {
            attributes,
            reason: "protected path outside every firewall",
        }
    }
}
