use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::test_support::{
    location, page_request, set_cookie_session, web_app, web_app_with_oauth,
};
use crate::api::v1::test_support::json_body;
use crate::auth::oauth::OAuthTokens;
use crate::auth::oauth_test::provider_config;
use crate::auth::session::FlashKind;
use crate::db::{Database, UserRepository};

#[tokio::test(flavor = "multi_thread")]
async fn login_without_provider_is_unavailable() {
    let app = web_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/auth/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn login_redirects_to_provider_with_stored_state() {
    let app = web_app_with_oauth(provider_config("https://id.example.com")).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("https://id.example.com/authorize?"));

    let session_id = set_cookie_session(&response).expect("session cookie");
    let state = app
        .state
        .sessions()
        .get(&session_id)
        .and_then(|s| s.oauth_state)
        .expect("oauth state stored");
    assert!(location(&response).contains(&format!("state={}", state)));
}

#[tokio::test(flavor = "multi_thread")]
async fn login_renders_page_when_messages_are_pending() {
    let app = web_app_with_oauth(provider_config("https://id.example.com")).await;
    let session_id = app.state.sessions().create();
    app.state
        .sessions()
        .flash(&session_id, FlashKind::Error, "Login failed: denied");

    let response = app
        .router
        .oneshot(page_request("GET", "/auth/login", &session_id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie_session(&response).is_none());
    let body = json_body(response).await;
    assert_eq!(body["component"], "auth/login");
    assert!(
        body["props"]["authorize_url"]
            .as_str()
            .unwrap()
            .starts_with("https://id.example.com/authorize?")
    );
    assert_eq!(body["flash"][0]["kind"], "error");
    assert_eq!(body["flash"][0]["message"], "Login failed: denied");
}

#[tokio::test(flavor = "multi_thread")]
async fn logged_in_user_skips_login() {
    let app = web_app_with_oauth(provider_config("https://id.example.com")).await;
    let (session_id, _) = app.login().await;

    let response = app
        .router
        .oneshot(page_request("GET", "/auth/login", &session_id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test(flavor = "multi_thread")]
async fn callback_rejects_mismatched_state() {
    let app = web_app_with_oauth(provider_config("https://id.example.com")).await;
    let session_id = app.state.sessions().create();
    app.state
        .sessions()
        .update(&session_id, |s| s.oauth_state = Some("expected".to_string()));

    let response = app
        .router
        .clone()
        .oneshot(page_request(
            "GET",
            "/auth/callback?code=abc&state=forged",
            &session_id,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");

    let session = app.state.sessions().get(&session_id).unwrap();
    assert!(session.user_id.is_none());
    assert_eq!(session.flash.len(), 1);
    assert_eq!(session.flash[0].kind, FlashKind::Error);
    assert_eq!(session.flash[0].message, "OAuth state mismatch");
}

#[tokio::test(flavor = "multi_thread")]
async fn callback_reports_provider_denial() {
    let app = web_app_with_oauth(provider_config("https://id.example.com")).await;
    let session_id = app.state.sessions().create();

    let response = app
        .router
        .clone()
        .oneshot(page_request(
            "GET",
            "/auth/callback?error=access_denied&error_description=User%20declined",
            &session_id,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
    let flash = app.flashes(&session_id);
    assert_eq!(flash[0].message, "Login failed: User declined");
}

#[tokio::test(flavor = "multi_thread")]
async fn callback_upserts_user_and_rotates_session() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "oauth-42",
            "email": "grace@example.com",
            "name": "Grace Hopper",
            "picture": "https://cdn.example.com/grace.png"
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let app = web_app_with_oauth(provider_config(&provider.uri())).await;
    let old_id = app.state.sessions().create();
    app.state
        .sessions()
        .update(&old_id, |s| s.oauth_state = Some("csrf-1".to_string()));

    let response = app
        .router
        .clone()
        .oneshot(page_request(
            "GET",
            "/auth/callback?code=abc&state=csrf-1",
            &old_id,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let new_id = set_cookie_session(&response).expect("new session cookie");
    assert_ne!(new_id, old_id);
    assert!(app.state.sessions().get(&old_id).is_none());

    let session = app.state.sessions().get(&new_id).unwrap();
    let user = app.db().users().get(session.user_id.unwrap()).await.unwrap();
    assert_eq!(user.oauth_id, "oauth-42");
    assert_eq!(user.email.as_deref(), Some("grace@example.com"));
    assert_eq!(user.full_name.as_deref(), Some("Grace Hopper"));
    assert_eq!(
        user.avatar_url.as_deref(),
        Some("https://cdn.example.com/grace.png")
    );
    assert_eq!(session.tokens.unwrap().access_token, "at-1");
    assert_eq!(session.flash[0].message, "Welcome, Grace Hopper");
}

#[tokio::test(flavor = "multi_thread")]
async fn pages_redirect_to_login_without_session() {
    let app = web_app().await;

    for uri in ["/", "/servers", "/services/1", "/settings"] {
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/auth/login", "{}", uri);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_session_cookie_redirects_to_login() {
    let app = web_app().await;

    let response = app
        .router
        .oneshot(page_request("GET", "/", "not-a-session"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_tokens_without_refresh_end_the_session() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;
    app.state.sessions().update(&session_id, |s| {
        s.tokens = Some(OAuthTokens {
            access_token: "old".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() - Duration::minutes(1)),
        })
    });

    let response = app
        .router
        .clone()
        .oneshot(page_request("GET", "/", &session_id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
    assert!(app.state.sessions().get(&session_id).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_tokens_are_refreshed_once() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let app = web_app_with_oauth(provider_config(&provider.uri())).await;
    let (session_id, _) = app.login().await;
    app.state.sessions().update(&session_id, |s| {
        s.tokens = Some(OAuthTokens {
            access_token: "at-1".to_string(),
            refresh_token: Some("rt-1".to_string()),
            expires_at: Some(Utc::now() - Duration::minutes(1)),
        })
    });

    let response = app
        .router
        .clone()
        .oneshot(page_request("GET", "/", &session_id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let tokens = app
        .state
        .sessions()
        .get(&session_id)
        .and_then(|s| s.tokens)
        .unwrap();
    assert_eq!(tokens.access_token, "at-2");
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn logout_destroys_session_and_clears_cookie() {
    let app = web_app().await;
    let (session_id, _) = app.login().await;

    let response = app
        .router
        .clone()
        .oneshot(page_request("POST", "/logout", &session_id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.contains("Max-Age=0"));
    assert!(app.state.sessions().get(&session_id).is_none());
}
