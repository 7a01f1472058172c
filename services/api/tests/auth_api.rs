//! HTTP-level integration tests for guest sign-in, sign-out and `/auth/me`.

mod common;

use axum::http::{header, StatusCode};
use common::{body_json, build_test_app};

#[tokio::test]
async fn guest_login_sets_cookie_and_resolves_me() {
    let app = build_test_app().await;

    let (session, user) = app.sign_in_guest("  Lan  ").await;
    assert!(user["id"].as_str().unwrap().starts_with("guest-"));
    assert_eq!(user["displayName"], "Lan");
    assert_eq!(user["isGuest"], true);
    assert_eq!(
        user["avatarUrl"],
        "https://api.dicebear.com/7.x/initials/svg?seed=Lan"
    );

    let response = app.get("/auth/me", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["id"], user["id"]);
}

#[tokio::test]
async fn blank_display_name_gets_default_name() {
    let app = build_test_app().await;
    let (_, user) = app.sign_in_guest("   ").await;
    assert_eq!(user["displayName"], "Mystery learner");
}

#[tokio::test]
async fn me_without_session_is_auth_required() {
    let app = build_test_app().await;

    let response = app.get("/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "AUTH_REQUIRED");

    let response = app.get("/auth/me", Some("not-a-session")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session_and_clears_the_cookie() {
    let app = build_test_app().await;
    let (session, _) = app.sign_in_guest("Minh").await;

    let response = app
        .post_json("/auth/logout", serde_json::json!({}), Some(&session))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("session=;"));
    assert!(cookie.contains("Max-Age=0"));

    let response = app.get("/auth/me", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_session_is_auth_required() {
    let app = build_test_app().await;
    let response = app.post_json("/auth/logout", serde_json::json!({}), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
