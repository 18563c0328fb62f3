//! End-to-end gate behavior through the full router stack.

mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::{get, json_body, limit_route, request, router_with_clock, test_config, ADMIN_TOKEN, INVITED_TOKEN, USER_TOKEN};

#[tokio::test]
async fn test_dashboard_navigation() {
    let (app, _) = router_with_clock(test_config());

    let anon = app.clone().oneshot(get("/dashboard/users", None)).await.unwrap();
    assert_eq!(anon.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(anon.headers()[header::LOCATION], "/login");

    let user = app.clone().oneshot(get("/dashboard/users", Some(USER_TOKEN))).await.unwrap();
    assert_eq!(user.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(user.headers()[header::LOCATION], "/");

    let admin = app.clone().oneshot(get("/dashboard/users", Some(ADMIN_TOKEN))).await.unwrap();
    assert_eq!(admin.status(), StatusCode::OK);
    assert_eq!(
        admin.headers()[header::STRICT_TRANSPORT_SECURITY],
        "max-age=31536000; includeSubDomains"
    );
    assert!(admin.headers().get(header::CONTENT_SECURITY_POLICY).is_none());
}

#[tokio::test]
async fn test_invited_admin_is_anonymous() {
    let (app, _) = router_with_clock(test_config());
    let response = app.oneshot(get("/dashboard", Some(INVITED_TOKEN))).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_login_page() {
    let (app, _) = router_with_clock(test_config());

    let anon = app.clone().oneshot(get("/login", None)).await.unwrap();
    assert_eq!(anon.status(), StatusCode::OK);

    let signed_in = app.clone().oneshot(get("/login", Some(USER_TOKEN))).await.unwrap();
    assert_eq!(signed_in.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(signed_in.headers()[header::LOCATION], "/dashboard");
}

#[tokio::test]
async fn test_api_rejections_are_json() {
    let (app, _) = router_with_clock(test_config());

    let anon = app.clone().oneshot(get("/api/users", None)).await.unwrap();
    assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);
    assert!(anon.headers().contains_key(header::CONTENT_SECURITY_POLICY));
    assert!(anon.headers().contains_key(header::STRICT_TRANSPORT_SECURITY));
    assert_eq!(json_body(anon).await, json!({ "error": "Unauthorized" }));

    let user = app.clone().oneshot(get("/api/users", Some(USER_TOKEN))).await.unwrap();
    assert_eq!(user.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(user).await, json!({ "error": "Forbidden" }));

    let admin = app.clone().oneshot(get("/api/users", Some(ADMIN_TOKEN))).await.unwrap();
    assert_eq!(admin.status(), StatusCode::OK);
    assert!(admin.headers()[header::CONTENT_SECURITY_POLICY]
        .to_str()
        .unwrap()
        .contains("script-src 'none'"));
}

#[tokio::test]
async fn test_eleventh_write_is_rate_limited() {
    let (app, clock) = router_with_clock(test_config());

    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(request("POST", "/api/posts", Some(USER_TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    clock.advance(Duration::from_secs(15));
    let limited = app
        .clone()
        .oneshot(request("POST", "/api/posts", Some(USER_TOKEN)))
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.headers()[header::RETRY_AFTER], "45");
    assert!(limited.headers().contains_key(header::STRICT_TRANSPORT_SECURITY));
    assert_eq!(json_body(limited).await, json!({ "error": "Too many requests" }));

    // A new window opens once the old one has fully elapsed.
    clock.advance(Duration::from_secs(45));
    let fresh = app
        .oneshot(request("POST", "/api/posts", Some(USER_TOKEN)))
        .await
        .unwrap();
    assert_eq!(fresh.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_rate_limit_applies_before_authentication() {
    let mut config = test_config();
    limit_route(&mut config, "users-api", 1);
    let (app, _) = router_with_clock(config);

    let first = app.clone().oneshot(get("/api/users", None)).await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let second = app.oneshot(get("/api/users", Some(ADMIN_TOKEN))).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_contact_concern_budget() {
    let (app, _) = router_with_clock(test_config());

    for _ in 0..5 {
        let response = app.clone().oneshot(request("POST", "/api/contact", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let limited = app.oneshot(request("POST", "/api/contact", None)).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.headers()[header::RETRY_AFTER], "60");
}

#[tokio::test]
async fn test_dashboard_concern_budget() {
    let (app, clock) = router_with_clock(test_config());

    for _ in 0..30 {
        let response = app
            .clone()
            .oneshot(get("/api/dashboard/stats", Some(ADMIN_TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    clock.advance(Duration::from_secs(20));
    let limited = app
        .oneshot(get("/api/dashboard/stats", Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.headers()[header::RETRY_AFTER], "40");
    assert_eq!(json_body(limited).await, json!({ "error": "Too many requests" }));
}

#[tokio::test]
async fn test_post_reads_and_writes_have_separate_room() {
    let (app, _) = router_with_clock(test_config());

    for _ in 0..20 {
        let read = app.clone().oneshot(get("/api/posts", Some(ADMIN_TOKEN))).await.unwrap();
        assert_eq!(read.status(), StatusCode::OK);
    }
    let write = app
        .oneshot(request("POST", "/api/posts", Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(write.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_public_pages_pass_untouched() {
    let mut config = test_config();
    config.rate_limit.max = 1;
    let (app, _) = router_with_clock(config);

    for _ in 0..3 {
        let response = app.clone().oneshot(get("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::X_XSS_PROTECTION));
    }

    let missing = app.oneshot(get("/no/such/page", None)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let (app, _) = router_with_clock(test_config());
    let request = axum::http::Request::get("/api/dashboard/stats")
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["published"], 0);
}

#[tokio::test]
async fn test_headers_can_be_disabled() {
    let mut config = test_config();
    config.security.enable_headers = false;
    let (app, _) = router_with_clock(config);
    let response = app.oneshot(get("/api/users", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());
}
