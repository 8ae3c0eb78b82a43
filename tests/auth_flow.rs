mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn register_login_code_reset() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ann Lee", "email": "Ann@Example.com", "password": "first-pass-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], "ann@example.com");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ann", "email": "ann@example.com", "password": "another-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let token = app.login("ann@example.com", "first-pass-1").await;
    let (status, me) = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Ann Lee");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@example.com", "password": "wrong-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    // Request a code and reset the password with it
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "ann@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let code = app.mail.code_for("ann@example.com").unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "email": "ann@example.com", "otp": code, "newPassword": "second-pass-2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["token"].is_string());

    // The code is single use
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "email": "ann@example.com", "code": code, "password": "third-pass-3" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@example.com", "password": "first-pass-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    app.login("ann@example.com", "second-pass-2").await;
}

#[tokio::test]
async fn passwordless_login_with_code() {
    let app = TestApp::new().await;
    app.request(
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Bo", "email": "bo@example.com", "password": "bo-password" })),
    )
    .await;

    app.request(
        Method::POST,
        "/api/auth/forgot-password",
        None,
        Some(json!({ "email": "bo@example.com" })),
    )
    .await;
    let code = app.mail.code_for("bo@example.com").unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login-code",
            None,
            Some(json!({ "email": "bo@example.com", "code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["email"], "bo@example.com");
}

#[tokio::test]
async fn repeated_wrong_codes_burn_the_live_code() {
    let app = TestApp::new().await;
    app.request(
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Cy", "email": "cy@example.com", "password": "cy-password" })),
    )
    .await;
    app.request(
        Method::POST,
        "/api/auth/forgot-password",
        None,
        Some(json!({ "email": "cy@example.com" })),
    )
    .await;
    let code = app.mail.code_for("cy@example.com").unwrap();
    let wrong = if code == "123456" { "654321" } else { "123456" };

    for _ in 0..5 {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/auth/login-code",
                None,
                Some(json!({ "email": "cy@example.com", "code": wrong })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login-code",
            None,
            Some(json!({ "email": "cy@example.com", "code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_email_gets_no_code() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert!(app.mail.code_for("ghost@example.com").is_none());
}

#[tokio::test]
async fn protected_routes_check_role() {
    let app = TestApp::new().await;
    let (status, _) = app.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/auth/me", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.request(
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Cy", "email": "cy@example.com", "password": "cy-password" })),
    )
    .await;
    let user = app.login("cy@example.com", "cy-password").await;
    let (status, body) = app
        .request(Method::GET, "/api/customers/all-customers", Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let admin = app.admin_token().await;
    let (status, body) = app
        .request(Method::GET, "/api/customers/all-customers", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["email"], "cy@example.com");
}

#[tokio::test]
async fn federated_login_requires_shared_secret() {
    let app = TestApp::new().await;
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/federated",
            None,
            Some(json!({ "email": "dee@example.com", "name": "Dee" })),
        )
        .await;
    // No secret configured
    assert_eq!(status, StatusCode::FORBIDDEN);
}
