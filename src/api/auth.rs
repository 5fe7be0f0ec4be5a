//! Backend auth contract: login, logout, session-wide logout, refresh.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::session::{ApiError, AuthSession, RefreshOutcome, RequestOptions};
use crate::utils::constants::{AUTH_LOGIN_PATH, AUTH_LOGOUT_ALL_PATH, AUTH_LOGOUT_PATH};

/// Credentials issued by `/auth/login`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Exchange email and password for credentials and store them.
///
/// A 401 here means bad credentials, so no refresh is attempted.
pub async fn login(session: &AuthSession, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let options = RequestOptions::post()
        .json(json!({ "email": email, "password": password }))
        .without_auth_retry();
    let tokens: LoginResponse = session.request_json(AUTH_LOGIN_PATH, options).await?;

    if let Some(access) = tokens.access.as_deref() {
        session.tokens().set_access(access);
    }
    if let Some(refresh) = tokens.refresh.as_deref() {
        session.tokens().set_refresh(refresh);
    }
    info!("logged in");
    Ok(tokens)
}

/// Revoke the current refresh credential on the backend, then clear local state
/// and go to login.
///
/// The backend identifies the session by its refresh credential: the stored one
/// in local mode, the cookie otherwise. It reads `Authorization` before the
/// cookie, so the access credential must not be sent here. Backend failures are
/// ignored, local credentials are cleared either way.
pub async fn logout(session: &AuthSession) {
    let options = RequestOptions::post().without_auth_retry();
    let options = match session.tokens().get_refresh() {
        Ok(Some(refresh)) => options.bearer_override(refresh),
        _ => options.without_bearer(),
    };
    end_session(session, AUTH_LOGOUT_PATH, options).await;
}

/// Revoke every session of the current user (authorized by the access
/// credential), then clear local state and go to login.
pub async fn logout_all(session: &AuthSession) {
    let options = RequestOptions::post().without_auth_retry();
    end_session(session, AUTH_LOGOUT_ALL_PATH, options).await;
}

/// Run the refresh protocol directly; true when new credentials were stored.
pub async fn refresh(session: &AuthSession) -> bool {
    session.refresh().await == RefreshOutcome::Succeeded
}

async fn end_session(session: &AuthSession, path: &str, options: RequestOptions) {
    if let Err(e) = session.request(path, options).await {
        debug!(path = %path, "logout call failed, clearing local state anyway: {}", e);
    }
    session.tokens().clear_all();
    session.browsing().redirect(&session.navigation().login_location);
    info!("logged out");
}
