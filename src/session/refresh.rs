use std::sync::atomic::Ordering;
use std::sync::Arc;

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::session::request::{bearer, header_value, resolve_url};
use crate::session::{AuthSession, SessionInner, JSON_MIME};
use crate::utils::constants::AUTH_REFRESH_PATH;

static SUCCEEDED_MSG: &str = "succeeded";
static FAILED_MSG: &str = "failed";

/// Settled state of one refresh attempt, shared by every caller that awaited it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Succeeded,
    /// `attempt` numbers the failed refresh within its session, starting at 1
    Failed { attempt: u64 },
}

/// Body of a successful `/auth/refresh`; either field may be absent when the
/// backend rotates the credential through its cookie only.
#[derive(Debug, Deserialize, Default)]
struct TokenPair {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

impl AuthSession {
    /// Run the refresh protocol.
    ///
    /// Callers arriving while a refresh is in flight await that same attempt,
    /// so at most one refresh call is ever on the wire per session. Credentials
    /// are only written on success; a failure leaves them untouched.
    pub async fn refresh(&self) -> RefreshOutcome {
        let inner = self.inner.clone();
        self.refresh_guard
            .run(move || async move { refresh_once(inner).await })
            .await
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_guard.is_in_flight()
    }
}

async fn refresh_once(inner: Arc<SessionInner>) -> RefreshOutcome {
    let attempt = inner.refresh_attempts.fetch_add(1, Ordering::SeqCst) + 1;
    let outcome = match call_refresh(&inner).await {
        Ok(pair) => {
            if let Some(access) = pair.access.as_deref() {
                inner.tokens.set_access(access);
            }
            if let Some(refresh) = pair.refresh.as_deref() {
                inner.tokens.set_refresh(refresh);
            }
            info!("access credential refreshed");
            RefreshOutcome::Succeeded
        }
        Err(reason) => {
            warn!("refresh failed: {}", reason);
            RefreshOutcome::Failed { attempt }
        }
    };

    let label = match outcome {
        RefreshOutcome::Succeeded => SUCCEEDED_MSG,
        RefreshOutcome::Failed { .. } => FAILED_MSG,
    };
    inner.metrics.refresh_attempts.with_label_values(&[label]).inc();
    outcome
}

async fn call_refresh(inner: &SessionInner) -> Result<TokenPair, String> {
    let url = resolve_url(&inner.base_url, AUTH_REFRESH_PATH).map_err(|e| e.to_string())?;
    let request_id = Uuid::new_v4().to_string();

    let mut request = inner
        .client
        .post(url.clone())
        .header(ACCEPT, HeaderValue::from_static(JSON_MIME))
        .header(
            inner.request_id_header.clone(),
            header_value(inner.request_id_header.as_str(), &request_id).map_err(|e| e.to_string())?,
        );

    // cookie mode: the jar carries the credential, nothing to attach
    match inner.tokens.get_refresh() {
        Ok(Some(refresh)) => {
            request = request.header(AUTHORIZATION, bearer(&refresh).map_err(|e| e.to_string())?);
        }
        Ok(None) => {}
        Err(e) => debug!("stored refresh credential not available: {}", e),
    }

    info!(request_id = %request_id, "refreshing access credential");
    let response = request
        .send()
        .await
        .map_err(|e| format!("transport error: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("refresh rejected with status {}", status));
    }

    response
        .json::<TokenPair>()
        .await
        .map_err(|e| format!("refresh response is not valid JSON: {}", e))
}
