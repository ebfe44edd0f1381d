/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";

pub const ADMIN_ROUTE_COMPONENT: &str = "admin";

pub const HEALTH_ROUTE_COMPONENT: &str = "health";
pub const ME_ROUTE_COMPONENT: &str = "me";

pub const LOGIN_ROUTE_COMPONENT: &str = "login";
pub const LOGOUT_ROUTE_COMPONENT: &str = "logout";
pub const DEFAULT_LOGIN_PATH: &str = const_str::concat!("/", LOGIN_ROUTE_COMPONENT);
pub const DEFAULT_LOGOUT_PATH: &str = const_str::concat!("/", LOGOUT_ROUTE_COMPONENT);

/// Security event names
pub const EVENT_AUTHORIZATION_GRANTED: &str = "security.authorization.granted";
pub const EVENT_AUTHORIZATION_DENIED: &str = "security.authorization.denied";
pub const EVENT_LOGIN_SUCCESS: &str = "security.login.success";
pub const EVENT_LOGIN_FAILURE: &str = "security.login.failure";
pub const EVENT_LOGOUT_SUCCESS: &str = "security.logout.success";
pub const EVENT_LOGOUT_FAILURE: &str = "security.logout.failure";
