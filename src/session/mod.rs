//! Authenticated request client.
//!
//! [`AuthSession`] is the one sanctioned path to the backend. It attaches the
//! access credential and a correlation id to every call, recovers from a 401
//! through a single shared refresh followed by exactly one retry, and on
//! unrecoverable auth failure clears credentials and navigates to login.

pub mod browsing;
pub mod error;
pub mod refresh;
pub mod request;
pub mod response;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::settings::{ApiConfig, NavigationConfig};
use crate::config::ClientConfig;
use crate::observability::metrics::{
    ClientMetrics, BANNED_LABEL, SESSION_EXPIRED_LABEL, TRANSPORT_LABEL,
};
use crate::resilience::single_flight::SingleFlight;
use crate::store::TokenStore;
use crate::utils::constants::SESSION_EXPIRED_MESSAGE;

pub use browsing::{BrowsingContext, LoggingBrowsingContext, ToastKind};
pub use error::{ApiError, HttpError};
pub use refresh::RefreshOutcome;
pub use request::{resolve_url, RequestBody, RequestOptions};

use request::Bearer;
pub use response::ResponseBody;

static JSON_MIME: &str = "application/json";

/// State shared by every clone of a session and by the in-flight refresh.
#[derive(Debug)]
pub(crate) struct SessionInner {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) request_id_header: HeaderName,
    pub(crate) navigation: NavigationConfig,
    pub(crate) tokens: TokenStore,
    pub(crate) browsing: Arc<dyn BrowsingContext>,
    pub(crate) metrics: ClientMetrics,
    /// refresh attempts started so far
    pub(crate) refresh_attempts: AtomicU64,
    /// highest failed attempt already reported to the user
    pub(crate) expired_attempt: AtomicU64,
}

/// One authenticated session against the backend.
///
/// Construct once per application instance and clone it into every component
/// that needs backend access; clones share credentials and the refresh guard.
#[derive(Debug, Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
    refresh_guard: Arc<SingleFlight<RefreshOutcome>>,
}

impl AuthSession {
    pub fn from_config(
        config: &ClientConfig,
        browsing: Arc<dyn BrowsingContext>,
    ) -> Result<Self, ApiError> {
        Self::new(
            &config.api,
            config.navigation.clone(),
            TokenStore::from_config(&config.storage),
            browsing,
        )
    }

    pub fn new(
        api: &ApiConfig,
        navigation: NavigationConfig,
        tokens: TokenStore,
        browsing: Arc<dyn BrowsingContext>,
    ) -> Result<Self, ApiError> {
        let request_id_header = HeaderName::from_bytes(api.request_id_header.as_bytes())
            .map_err(|e| ApiError::InvalidHeader {
                name: api.request_id_header.to_owned(),
                reason: e.to_string(),
            })?;

        // cookie jar plays the role of credential-bearing fetch mode
        let client = Client::builder()
            .cookie_store(true)
            .timeout(api.timeout())
            .build()
            .map_err(|e| ApiError::Configuration(format!("http client: {}", e)))?;

        let metrics = ClientMetrics::new()
            .map_err(|e| ApiError::Configuration(format!("metrics registry: {}", e)))?;

        Ok(Self {
            inner: Arc::new(SessionInner {
                client,
                base_url: api.base_url.to_owned(),
                request_id_header,
                navigation,
                tokens,
                browsing,
                metrics,
                refresh_attempts: AtomicU64::new(0),
                expired_attempt: AtomicU64::new(0),
            }),
            refresh_guard: Arc::new(SingleFlight::new()),
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.inner.metrics
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub(crate) fn browsing(&self) -> &dyn BrowsingContext {
        self.inner.browsing.as_ref()
    }

    pub(crate) fn navigation(&self) -> &NavigationConfig {
        &self.inner.navigation
    }

    /// Perform an authenticated request.
    ///
    /// A 401 triggers the shared refresh and one retry with the new credential,
    /// unless `retry_on_auth_failure` is off. The retry never refreshes again.
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        let base = options.base_url.as_deref().unwrap_or(self.inner.base_url.as_str());
        let url = resolve_url(base, path)?;
        // one id per logical call, shared by the retry
        let request_id = Uuid::new_v4().to_string();

        let mut response = self.send(&url, &options, &request_id).await?;

        if response.status() == StatusCode::UNAUTHORIZED && options.retry_on_auth_failure {
            debug!(url = %url, request_id = %request_id, "401 received, refreshing");
            match self.refresh().await {
                RefreshOutcome::Succeeded => {
                    response = self.send(&url, &options, &request_id).await?;
                }
                RefreshOutcome::Failed { attempt } => return Err(self.expire_session(attempt)),
            }
        }

        if !response.status().is_success() {
            return Err(self.reject(&url, response).await);
        }

        response::decode_success(&url, response).await
    }

    /// [`request`](Self::request) and deserialize the body into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = path.to_owned();
        self.request(path, options)
            .await?
            .json()
            .map_err(|e| ApiError::Decode { url, reason: e.to_string() })
    }

    async fn send(
        &self,
        url: &Url,
        options: &RequestOptions,
        request_id: &str,
    ) -> Result<Response, ApiError> {
        let inner = &self.inner;
        let mut headers = options.headers.clone();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MIME));

        let mut builder = inner.client.request(options.method.clone(), url.clone());
        match &options.body {
            Some(RequestBody::Json(value)) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
                builder = builder.json(value);
            }
            Some(RequestBody::Raw { bytes, content_type }) => {
                if let Some(content_type) = content_type {
                    headers.insert(CONTENT_TYPE, request::header_value("content-type", content_type)?);
                }
                builder = builder.body(bytes.clone());
            }
            None => {}
        }

        let token = match &options.bearer {
            Bearer::Access => self.current_access(),
            Bearer::Token(token) => Some(token.to_owned()),
            Bearer::Omitted => None,
        };
        if let Some(token) = token {
            headers.insert(AUTHORIZATION, request::bearer(&token)?);
        }
        headers.insert(
            inner.request_id_header.clone(),
            request::header_value(inner.request_id_header.as_str(), request_id)?,
        );

        let method = options.method.as_str();
        let start = Instant::now();
        debug!(method = %method, url = %url, request_id = %request_id, "sending request");

        let result = builder.headers(headers).send().await;
        inner.metrics.request_duration.with_label_values(&[method]).observe(start.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                let status = response.status();
                inner.metrics.requests.with_label_values(&[method, status.as_str()]).inc();
                debug!(method = %method, url = %url, request_id = %request_id, status = status.as_u16(), "response received");
                Ok(response)
            }
            Err(source) => {
                inner.metrics.requests.with_label_values(&[method, TRANSPORT_LABEL]).inc();
                inner.metrics.transport_errors.inc();
                warn!(method = %method, url = %url, request_id = %request_id, "request failed: {}", source);
                Err(ApiError::Transport { url: url.to_string(), source })
            }
        }
    }

    /// Storage trouble reads as "no credential": the call goes out unauthenticated.
    fn current_access(&self) -> Option<String> {
        self.inner.tokens.get_access().unwrap_or_else(|e| {
            warn!("access credential not available: {}", e);
            None
        })
    }

    /// Terminal auth failure: wipe credentials, tell the user, go to login.
    ///
    /// Every caller sharing one failed attempt gets the error; the toast and the
    /// navigation happen once per attempt.
    fn expire_session(&self, attempt: u64) -> ApiError {
        let inner = &self.inner;
        inner.tokens.clear_all();
        if inner.expired_attempt.fetch_max(attempt, Ordering::SeqCst) < attempt {
            warn!(attempt, "refresh failed, session expired");
            inner.metrics.auth_failures.with_label_values(&[SESSION_EXPIRED_LABEL]).inc();
            inner.browsing.toast(ToastKind::Error, SESSION_EXPIRED_MESSAGE);
            inner.browsing.redirect(&inner.navigation.login_location);
        }
        ApiError::Unauthenticated { message: "Refresh failed".to_owned() }
    }

    async fn reject(&self, url: &Url, response: Response) -> ApiError {
        let status = response.status();
        let raw = match response.text().await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(url = %url, "error body not readable: {}", e);
                String::new()
            }
        };
        let error = HttpError::from_body(status, &raw);

        let inner = &self.inner;
        if status == StatusCode::FORBIDDEN
            && error.code.as_deref() == Some(inner.navigation.banned_code.as_str())
        {
            info!(url = %url, "account banned, leaving to the forbidden page");
            inner.tokens.clear_all();
            inner.metrics.auth_failures.with_label_values(&[BANNED_LABEL]).inc();
            inner.browsing.redirect(&inner.navigation.forbidden_location);
            return ApiError::ForbiddenBanned(error);
        }

        ApiError::Http(error)
    }
}
