use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;

use crate::session::error::ApiError;

/// Payload of a request, told apart by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// structured value, serialized as `application/json`
    Json(Value),
    /// pre-built payload sent unchanged, e.g. a multipart form
    Raw {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
}

/// Which bearer credential a request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum Bearer {
    /// the stored access credential, when there is one
    #[default]
    Access,
    /// this token instead of the access credential (refresh-token endpoints)
    Token(String),
    /// no `Authorization` header at all; cookies still go out
    Omitted,
}

/// Per-call options of [`AuthSession::request`](crate::session::AuthSession::request).
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    /// when false a 401 is returned as-is, without a refresh
    pub retry_on_auth_failure: bool,
    /// overrides the configured base url for this call
    pub base_url: Option<String>,
    pub(crate) bearer: Bearer,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            retry_on_auth_failure: true,
            base_url: None,
            bearer: Bearer::Access,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self { method, ..Self::default() }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn raw(mut self, bytes: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        self.body = Some(RequestBody::Raw {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_owned),
        });
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn without_auth_retry(mut self) -> Self {
        self.retry_on_auth_failure = false;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub(crate) fn bearer_override(mut self, token: String) -> Self {
        self.bearer = Bearer::Token(token);
        self
    }

    pub(crate) fn without_bearer(mut self) -> Self {
        self.bearer = Bearer::Omitted;
        self
    }
}

/// Join `base` and `path` with exactly one slash between them.
///
/// A `path` that is already an absolute http(s) url is used unchanged.
pub fn resolve_url(base: &str, path: &str) -> Result<Url, ApiError> {
    let joined = if path.starts_with("http://") || path.starts_with("https://") {
        path.to_owned()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    };
    Url::parse(&joined).map_err(|e| ApiError::InvalidUrl {
        url: joined,
        reason: e.to_string(),
    })
}

pub(crate) fn header_value(name: &str, value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::InvalidHeader {
        name: name.to_owned(),
        reason: e.to_string(),
    })
}

pub(crate) fn bearer(token: &str) -> Result<HeaderValue, ApiError> {
    let mut value = header_value("authorization", &format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}
