// Request client behaviour against a mocked backend:
//  - credentials and correlation id on every call
//  - 401 -> one refresh -> one retry
//  - terminal refresh failure, banned accounts, plain errors

#[cfg(test)]
mod test {
    use std::time::Duration;

    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use reqwest::StatusCode;
    use serde_json::json;

    use crate::session::{ApiError, RequestOptions, ResponseBody, ToastKind};
    use crate::config::settings::ApiConfig;
    use crate::store::TokenStore;
    use crate::tests::common::{cookie_session, local_session, session_with_api};
    use crate::utils::constants::SESSION_EXPIRED_MESSAGE;

    #[tokio::test]
    async fn attaches_credentials_and_correlation_id() {
        let server = MockServer::start_async().await;
        let me = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/me")
                    .header("authorization", "Bearer a1")
                    .header("accept", "application/json")
                    .header_exists("x-request-id");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"email": "admin@example.com", "roles": ["admin"]}));
            })
            .await;

        let (session, _) = cookie_session(&server.base_url());
        session.tokens().set_access("a1");

        let body = session.request("me", RequestOptions::get()).await.unwrap();
        assert_eq!(body.as_json().unwrap()["email"], "admin@example.com");
        me.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn no_authorization_without_access_credential() {
        let server = MockServer::start_async().await;
        let with_auth = server
            .mock_async(|when, then| {
                when.method(GET).path("/public").header_exists("authorization");
                then.status(500);
            })
            .await;
        let without_auth = server
            .mock_async(|when, then| {
                when.method(GET).path("/public");
                then.status(200).body("ok");
            })
            .await;

        let (session, _) = cookie_session(&server.base_url());
        let body = session.request("/public", RequestOptions::get()).await.unwrap();

        assert_eq!(body, ResponseBody::Text("ok".to_owned()));
        with_auth.assert_calls_async(0).await;
        without_auth.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn refresh_then_single_retry_with_new_credential() {
        let server = MockServer::start_async().await;
        let users_old = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/admin/users")
                    .query_param("page", "2")
                    .header("authorization", "Bearer old");
                then.status(401).json_body(json!({"detail": "Token expired"}));
            })
            .await;
        let users_new = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/admin/users")
                    .query_param("page", "2")
                    .header("authorization", "Bearer new");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"items": [], "total": 0}));
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/refresh");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"access": "new", "refresh": "r2"}));
            })
            .await;

        let (session, browsing) = cookie_session(&server.base_url());
        session.tokens().set_access("old");

        let body = session
            .request("/admin/users?page=2", RequestOptions::get())
            .await
            .unwrap();

        assert_eq!(body.as_json().unwrap()["total"], 0);
        refresh.assert_calls_async(1).await;
        users_old.assert_calls_async(1).await;
        users_new.assert_calls_async(1).await;
        assert_eq!(session.tokens().get_access().unwrap().as_deref(), Some("new"));
        // cookie mode: the returned refresh credential is not kept client-side
        assert_eq!(session.tokens().get_refresh().unwrap(), None);
        assert_eq!(session.metrics().refresh_count(), 1);
        assert!(browsing.redirects().is_empty());
        assert!(!session.is_refreshing());
    }

    #[tokio::test]
    async fn failed_refresh_is_terminal() {
        let server = MockServer::start_async().await;
        let me = server
            .mock_async(|when, then| {
                when.method(GET).path("/me");
                then.status(401).json_body(json!({"detail": "Token expired"}));
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/refresh");
                then.status(401).json_body(json!({"detail": "Invalid refresh token"}));
            })
            .await;

        let (session, browsing) = local_session(&server.base_url());
        session.tokens().set_access("old");
        session.tokens().set_refresh("r-old");

        let err = session.request("/me", RequestOptions::get()).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthenticated { .. }), "got {err:?}");
        assert!(err.is_terminal());
        refresh.assert_calls_async(1).await;
        me.assert_calls_async(1).await;
        assert_eq!(session.tokens().get_access().unwrap(), None);
        assert_eq!(session.tokens().get_refresh().unwrap(), None);
        assert_eq!(
            browsing.toasts(),
            vec![(ToastKind::Error, SESSION_EXPIRED_MESSAGE.to_owned())]
        );
        assert_eq!(browsing.redirects(), vec!["/login.html".to_owned()]);
    }

    #[tokio::test]
    async fn disabled_retry_returns_401_without_refresh() {
        let server = MockServer::start_async().await;
        let me = server
            .mock_async(|when, then| {
                when.method(GET).path("/me");
                then.status(401).json_body(json!({"detail": "Token expired"}));
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/refresh");
                then.status(200).json_body(json!({"access": "new"}));
            })
            .await;

        let (session, browsing) = cookie_session(&server.base_url());
        session.tokens().set_access("old");

        let err = session
            .request("/me", RequestOptions::get().without_auth_retry())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(matches!(err, ApiError::Http(_)));
        refresh.assert_calls_async(0).await;
        me.assert_calls_async(1).await;
        assert_eq!(session.tokens().get_access().unwrap().as_deref(), Some("old"));
        assert!(browsing.redirects().is_empty());
    }

    #[tokio::test]
    async fn second_401_after_refresh_is_not_retried_again() {
        let server = MockServer::start_async().await;
        let me = server
            .mock_async(|when, then| {
                when.method(GET).path("/me");
                then.status(401).json_body(json!({"detail": "Token expired"}));
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/refresh");
                then.status(200).json_body(json!({"access": "new"}));
            })
            .await;

        let (session, _) = cookie_session(&server.base_url());
        session.tokens().set_access("old");

        let err = session.request("/me", RequestOptions::get()).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(!err.is_terminal());
        refresh.assert_calls_async(1).await;
        me.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn banned_account_clears_credentials_and_leaves() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/me");
                then.status(403)
                    .header("content-type", "application/json")
                    .json_body(json!({"detail": "User is banned", "code": "user_banned"}));
            })
            .await;

        let (session, browsing) = local_session(&server.base_url());
        session.tokens().set_access("a1");
        session.tokens().set_refresh("r1");

        let err = session.request("/me", RequestOptions::get()).await.unwrap_err();

        match &err {
            ApiError::ForbiddenBanned(http) => {
                assert_eq!(http.code.as_deref(), Some("user_banned"));
                assert_eq!(http.message, "User is banned");
            }
            other => panic!("expected ForbiddenBanned, got {other:?}"),
        }
        assert_eq!(session.tokens().get_access().unwrap(), None);
        assert_eq!(session.tokens().get_refresh().unwrap(), None);
        assert_eq!(browsing.redirects(), vec!["/403.html".to_owned()]);
        assert!(browsing.toasts().is_empty());
    }

    #[tokio::test]
    async fn plain_forbidden_keeps_credentials() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/admin/users");
                then.status(403)
                    .header("content-type", "application/json")
                    .json_body(json!({"detail": "Admin role required", "code": "forbidden"}));
            })
            .await;

        let (session, browsing) = cookie_session(&server.base_url());
        session.tokens().set_access("a1");

        let err = session.request("/admin/users", RequestOptions::get()).await.unwrap_err();

        match &err {
            ApiError::Http(http) => {
                assert_eq!(http.status, StatusCode::FORBIDDEN);
                assert_eq!(http.code.as_deref(), Some("forbidden"));
                assert_eq!(http.message, "Admin role required");
                assert_eq!(http.body.as_ref().unwrap()["code"], "forbidden");
            }
            other => panic!("expected Http, got {other:?}"),
        }
        assert_eq!(session.tokens().get_access().unwrap().as_deref(), Some("a1"));
        assert!(browsing.redirects().is_empty());
    }

    #[tokio::test]
    async fn unstructured_error_uses_reason_phrase() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/buildings/42");
                then.status(404).body("<html>missing</html>");
            })
            .await;

        let (session, _) = cookie_session(&server.base_url());
        let err = session.request("/buildings/42", RequestOptions::get()).await.unwrap_err();

        match err {
            ApiError::Http(http) => {
                assert_eq!(http.status, StatusCode::NOT_FOUND);
                assert_eq!(http.code, None);
                assert_eq!(http.message, "Not Found");
                assert!(http.body.is_none());
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn structured_body_is_sent_as_json() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/admin/users")
                    .header("content-type", "application/json")
                    .json_body(json!({"email": "new@example.com", "roles": ["viewer"]}));
                then.status(201)
                    .header("content-type", "application/json")
                    .json_body(json!({"id": "u-1"}));
            })
            .await;

        let (session, _) = cookie_session(&server.base_url());
        let body = session
            .request(
                "/admin/users",
                RequestOptions::post().json(json!({"email": "new@example.com", "roles": ["viewer"]})),
            )
            .await
            .unwrap();

        assert_eq!(body.as_json().unwrap()["id"], "u-1");
        create.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn raw_body_is_passed_through() {
        let payload = "--XyZ\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nTower A\r\n--XyZ--\r\n";
        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/buildings")
                    .header("content-type", "multipart/form-data; boundary=XyZ")
                    .body(payload);
                then.status(201)
                    .header("content-type", "application/json")
                    .json_body(json!({"id": "b-1"}));
            })
            .await;

        let (session, _) = cookie_session(&server.base_url());
        session.tokens().set_access("a1");
        let body = session
            .request(
                "/buildings",
                RequestOptions::post().raw(payload, Some("multipart/form-data; boundary=XyZ")),
            )
            .await
            .unwrap();

        assert_eq!(body.as_json().unwrap()["id"], "b-1");
        upload.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn base_url_can_be_overridden_per_call() {
        let server = MockServer::start_async().await;
        let me = server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/me");
                then.status(200).body("v2");
            })
            .await;

        let (session, _) = cookie_session("http://127.0.0.1:1/unused");
        let body = session
            .request("/me", RequestOptions::get().base_url(server.url("/v2/")))
            .await
            .unwrap();

        assert_eq!(body.as_text(), Some("v2"));
        me.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let (session, browsing) = cookie_session("http://127.0.0.1:1");
        session.tokens().set_access("a1");

        let err = session.request("/me", RequestOptions::get()).await.unwrap_err();

        assert!(matches!(err, ApiError::Transport { .. }), "got {err:?}");
        assert_eq!(session.tokens().get_access().unwrap().as_deref(), Some("a1"));
        assert!(browsing.redirects().is_empty());
        assert_eq!(session.metrics().transport_errors.get(), 1);
    }

    #[tokio::test]
    async fn local_mode_refresh_sends_stored_credential() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/me").header("authorization", "Bearer old");
                then.status(401);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/me").header("authorization", "Bearer new");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"email": "admin@example.com"}));
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/refresh")
                    .header("authorization", "Bearer r1");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"access": "new", "refresh": "r2"}));
            })
            .await;

        let (session, _) = local_session(&server.base_url());
        session.tokens().set_access("old");
        session.tokens().set_refresh("r1");

        session.request("/me", RequestOptions::get()).await.unwrap();

        refresh.assert_calls_async(1).await;
        assert_eq!(session.tokens().get_access().unwrap().as_deref(), Some("new"));
        assert_eq!(session.tokens().get_refresh().unwrap().as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn refresh_without_any_session_fails_cleanly() {
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/refresh");
                then.status(401).json_body(json!({"detail": "Missing refresh token"}));
            })
            .await;

        let (session, browsing) = cookie_session(&server.base_url());

        assert!(!crate::api::auth::refresh(&session).await);
        refresh.assert_calls_async(1).await;
        // the protocol itself never clears credentials or navigates
        assert!(browsing.redirects().is_empty());
        assert!(browsing.toasts().is_empty());
    }

    #[tokio::test]
    async fn rejected_refresh_leaves_credentials_untouched() {
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/refresh")
                    .header("authorization", "Bearer r1");
                then.status(401).json_body(json!({"detail": "Invalid refresh token"}));
            })
            .await;

        let (session, browsing) = local_session(&server.base_url());
        session.tokens().set_access("a1");
        session.tokens().set_refresh("r1");

        assert!(!crate::api::auth::refresh(&session).await);

        refresh.assert_calls_async(1).await;
        assert_eq!(session.tokens().get_access().unwrap().as_deref(), Some("a1"));
        assert_eq!(session.tokens().get_refresh().unwrap().as_deref(), Some("r1"));
        assert!(browsing.redirects().is_empty());
    }

    #[tokio::test]
    async fn unreachable_refresh_endpoint_leaves_credentials_untouched() {
        let (session, browsing) = local_session("http://127.0.0.1:1");
        session.tokens().set_access("a1");
        session.tokens().set_refresh("r1");

        assert!(!crate::api::auth::refresh(&session).await);

        assert_eq!(session.tokens().get_access().unwrap().as_deref(), Some("a1"));
        assert_eq!(session.tokens().get_refresh().unwrap().as_deref(), Some("r1"));
        assert!(browsing.redirects().is_empty());
        assert_eq!(
            session.metrics().refresh_attempts.with_label_values(&["failed"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn slow_backend_times_out_without_refreshing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/me");
                then.status(401).delay(Duration::from_millis(500));
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/refresh");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"access": "a2"}));
            })
            .await;

        let mut api = ApiConfig::new(server.base_url());
        api.timeout_ms = 50;
        let (session, browsing) = session_with_api(&api, TokenStore::in_memory());
        session.tokens().set_access("a1");

        let err = session.request("/me", RequestOptions::get()).await.unwrap_err();

        assert!(matches!(err, ApiError::Transport { .. }), "got {err:?}");
        refresh.assert_calls_async(0).await;
        assert_eq!(session.tokens().get_access().unwrap().as_deref(), Some("a1"));
        assert!(browsing.redirects().is_empty());
    }
}
