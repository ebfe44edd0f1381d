use std::collections::HashSet;

use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{DEFAULT_LOGIN_PATH, DEFAULT_LOGOUT_PATH};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecuritySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the bind address in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Declarative security policy, translated into the engine builder at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecuritySettings {
    #[serde(default)]
    pub global: GlobalSecuritySettings,
    #[serde(default)]
    pub firewalls: Vec<FirewallSettings>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySetting {
    #[default]
    Affirmative,
    Consensus,
    Unanimous,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeSetting {
    #[default]
    LocalFirst,
    GlobalFirst,
    OverrideOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessRuleSettings {
    pub path: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

/// One role-hierarchy edge set. Roles are values, never keys, so their case survives
/// the configuration loader.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleInheritanceSettings {
    pub role: String,
    #[serde(default)]
    pub inherits: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalSecuritySettings {
    /// Strategy of the global decision manager. `None` leaves firewalls without one
    /// unless they declare their own.
    pub strategy: Option<StrategySetting>,
    pub role_hierarchy: Option<Vec<RoleInheritanceSettings>>,
    pub access_control: Option<Vec<AccessRuleSettings>>,
    /// Enables the login-redirect entry point.
    pub login_path: Option<String>,
    #[serde(default)]
    pub denied_handler: bool,
    /// Path to a casbin policy CSV enabling the `perm:` voter.
    pub casbin_policy: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirewallSettings {
    pub name: String,
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default)]
    pub stateless: bool,
    #[serde(default)]
    pub merge: MergeSetting,
    #[serde(default = "default_inherit_global")]
    pub inherit_global: bool,
    pub access_control: Option<Vec<AccessRuleSettings>>,
    pub role_hierarchy: Option<Vec<RoleInheritanceSettings>>,
    pub strategy: Option<StrategySetting>,
    pub api_key: Option<ApiKeySettings>,
    pub proxy: Option<ProxyAuthSettings>,
    pub required_header: Option<RequiredHeaderSettings>,
    pub login_path: Option<String>,
    pub logout_path: Option<String>,
}

impl FirewallSettings {
    /// ## Summary
    /// Login path of a stateful firewall, falling back to the default route.
    #[must_use]
    pub fn effective_login_path(&self) -> &str {
        self.login_path.as_deref().unwrap_or(DEFAULT_LOGIN_PATH)
    }

    /// ## Summary
    /// Logout path of a stateful firewall, falling back to the default route.
    #[must_use]
    pub fn effective_logout_path(&self) -> &str {
        self.logout_path.as_deref().unwrap_or(DEFAULT_LOGOUT_PATH)
    }
}

impl SecuritySettings {
    /// ## Summary
    /// Checks the declarative section for mistakes the engine builder cannot express,
    /// such as blank names or credentials.
    ///
    /// ## Errors
    /// Returns `InvalidConfiguration` describing the first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: String| Err(CoreError::InvalidConfiguration(reason));
        let mut names = HashSet::new();

        for firewall in &self.firewalls {
            let name = firewall.name.trim();
            if name.is_empty() {
                return invalid("firewall name must not be empty".to_string());
            }
            if !names.insert(name) {
                return invalid(format!("duplicate firewall `{name}`"));
            }
            if firewall.stateless
                && (firewall.login_path.is_some() || firewall.logout_path.is_some())
            {
                return invalid(format!(
                    "stateless firewall `{name}` must not declare login or logout paths"
                ));
            }
            if let Some(api_key) = &firewall.api_key
                && (api_key.header.trim().is_empty() || api_key.value.is_empty())
            {
                return invalid(format!("firewall `{name}` has an incomplete api_key section"));
            }
            if let Some(required) = &firewall.required_header
                && required.header.trim().is_empty()
            {
                return invalid(format!("firewall `{name}` has a blank required_header"));
            }
            if let Some(proxy) = &firewall.proxy {
                if proxy.header.trim().is_empty() {
                    return invalid(format!("firewall `{name}` has a blank proxy header"));
                }
                if proxy.users.is_empty() {
                    tracing::warn!(
                        firewall = %name,
                        "Proxy authentication configured without users"
                    );
                }
            }
        }
        Ok(())
    }
}

const fn default_inherit_global() -> bool {
    true
}

#[derive(Clone, Deserialize)]
pub struct ApiKeySettings {
    pub header: String,
    pub value: String,
    pub user: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl std::fmt::Debug for ApiKeySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeySettings")
            .field("header", &self.header)
            .field("value", &"<redacted>")
            .field("user", &self.user)
            .field("roles", &self.roles)
            .finish()
    }
}

/// Trusts an upstream proxy header naming the user; roles come from `users`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyAuthSettings {
    pub header: String,
    #[serde(default)]
    pub users: Vec<ProxyUserSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyUserSettings {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Clone, Deserialize)]
pub struct RequiredHeaderSettings {
    pub header: String,
    pub value: String,
}

impl std::fmt::Debug for RequiredHeaderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequiredHeaderSettings")
            .field("header", &self.header)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional `config` file
    /// (`config.toml`, `config.yaml` or `config.json`).
    /// Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Self::defaults()?
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("RAMPART")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// ## Summary
    /// Parses settings from a TOML document layered over the defaults.
    ///
    /// ## Errors
    /// Returns an error if the document is malformed or does not deserialize.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        Ok(Self::defaults()?
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8698)?
            .set_default("logging.level", "debug")?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
