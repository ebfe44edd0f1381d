use std::sync::Arc;

use salvo::Request;

use super::CompiledFirewall;
use crate::access_control::AccessControl;
use crate::error::{SecurityError, SecurityResult};

/// Compiled firewalls in declaration order plus the global access control used when no
/// firewall claims a request.
#[derive(Debug, Default)]
pub struct FirewallRegistry {
    firewalls: Vec<Arc<CompiledFirewall>>,
    global_access_control: AccessControl,
}

impl FirewallRegistry {
    pub(crate) const fn new(
        firewalls: Vec<Arc<CompiledFirewall>>,
        global_access_control: AccessControl,
    ) -> Self {
        Self {
            firewalls,
            global_access_control,
        }
    }

    /// ## Summary
    /// The first firewall, in declaration order, whose matcher accepts `req`.
    #[must_use]
    pub fn match_request(&self, req: &Request) -> Option<&Arc<CompiledFirewall>> {
        self.firewalls.iter().find(|firewall| firewall.matches(req))
    }

    /// ## Summary
    /// Looks a firewall up by name.
    ///
    /// ## Errors
    /// Returns a configuration error naming the firewall when it does not exist.
    pub fn firewall(&self, name: &str) -> SecurityResult<&Arc<CompiledFirewall>> {
        self.firewalls
            .iter()
            .find(|firewall| firewall.name() == name)
            .ok_or_else(|| SecurityError::firewall_configuration(name, "unknown firewall"))
    }

    #[must_use]
    pub fn firewalls(&self) -> &[Arc<CompiledFirewall>] {
        &self.firewalls
    }

    #[must_use]
    pub const fn global_access_control(&self) -> &AccessControl {
        &self.global_access_control
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.firewalls.is_empty()
    }
}
