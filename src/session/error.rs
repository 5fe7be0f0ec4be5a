use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Non-2xx response surfaced to the caller with its structured detail.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    pub status: StatusCode,
    /// machine-readable `code` field of the error body
    pub code: Option<String>,
    pub message: String,
    /// parsed error body, when it was JSON
    pub body: Option<Value>,
}

impl HttpError {
    /// Build from a status and the raw error body.
    ///
    /// The message comes from `detail`, then `message`, then the status reason phrase.
    pub fn from_body(status: StatusCode, raw: &str) -> Self {
        let body: Option<Value> = serde_json::from_str(raw).ok();
        let field = |name: &str| {
            body.as_ref()
                .and_then(|b| b.get(name))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        let code = field("code");
        let message = field("detail")
            .or_else(|| field("message"))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown status").to_owned());

        Self { status, code, message, body }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "HTTP {} ({}): {}", self.status.as_u16(), code, self.message),
            None => write!(f, "HTTP {}: {}", self.status.as_u16(), self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend was never reached: connection refused, DNS, timeout.
    #[error("transport error calling {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("{0}")]
    Http(HttpError),
    /// Refresh failed; credentials are gone and the caller must re-authenticate.
    #[error("unauthenticated: {message}")]
    Unauthenticated { message: String },
    #[error("account is banned: {0}")]
    ForbiddenBanned(HttpError),
    #[error("cannot decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http(e) | ApiError::ForbiddenBanned(e) => Some(e.status),
            ApiError::Unauthenticated { .. } => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Http(e) | ApiError::ForbiddenBanned(e) => e.code.as_deref(),
            ApiError::Unauthenticated { .. } => Some("unauthenticated"),
            _ => None,
        }
    }

    /// Errors after which the session has already navigated away; callers must not retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApiError::Unauthenticated { .. } | ApiError::ForbiddenBanned(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_error_body() {
        let raw = json!({"code": "user_banned", "detail": "User is banned"}).to_string();
        let err = HttpError::from_body(StatusCode::FORBIDDEN, &raw);
        assert_eq!(err.code.as_deref(), Some("user_banned"));
        assert_eq!(err.message, "User is banned");
        assert_eq!(err.body.unwrap()["detail"], "User is banned");
    }

    #[test]
    fn falls_back_to_reason_phrase() {
        let err = HttpError::from_body(StatusCode::NOT_FOUND, "<html>nope</html>");
        assert_eq!(err.code, None);
        assert_eq!(err.message, "Not Found");
        assert!(err.body.is_none());
    }

    #[test]
    fn non_string_detail_is_ignored() {
        let raw = json!({"detail": [{"loc": "email"}], "message": "validation failed"}).to_string();
        let err = HttpError::from_body(StatusCode::UNPROCESSABLE_ENTITY, &raw);
        assert_eq!(err.message, "validation failed");
    }

    #[test]
    fn terminal_errors() {
        let banned = ApiError::ForbiddenBanned(HttpError::from_body(StatusCode::FORBIDDEN, ""));
        assert!(banned.is_terminal());
        assert_eq!(banned.status(), Some(StatusCode::FORBIDDEN));

        let unauth = ApiError::Unauthenticated { message: "Refresh failed".into() };
        assert!(unauth.is_terminal());
        assert_eq!(unauth.code(), Some("unauthenticated"));

        let plain = ApiError::Http(HttpError::from_body(StatusCode::CONFLICT, ""));
        assert!(!plain.is_terminal());
    }
}
