//! Shared constants and invariants

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REQUEST_ID_HEADER: &str = "X-Request-ID";

pub const DEFAULT_LOGIN_LOCATION: &str = "/login.html";
pub const DEFAULT_FORBIDDEN_LOCATION: &str = "/403.html";
pub const DEFAULT_BANNED_CODE: &str = "user_banned";

// Backend auth contract
pub const AUTH_LOGIN_PATH: &str = "/auth/login";
pub const AUTH_REFRESH_PATH: &str = "/auth/refresh";
pub const AUTH_LOGOUT_PATH: &str = "/auth/logout";
pub const AUTH_LOGOUT_ALL_PATH: &str = "/auth/logout_all";

// Storage keys
pub const ACCESS_KEY: &str = "pf_access";
pub const REFRESH_KEY: &str = "pf_refresh";

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please login again";
