use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use roster_server::{routes::create_router, Config};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

/// Router over a pool that never connects; only paths that stay off the
/// database are exercised here.
fn app() -> Router {
    let config = Config::for_tests(std::env::temp_dir().join("roster-router-tests"));
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();
    create_router(pool, config)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[tokio::test]
async fn health_check_answers_ok() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn admin_page_without_session_redirects_to_login() {
    let response = app()
        .oneshot(Request::get("/admin/user?page=2").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn admin_page_with_forged_cookie_redirects_to_login() {
    let response = app()
        .oneshot(
            Request::get("/admin/user")
                .header(header::COOKIE, "roster_session=not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn server_actions_require_a_session() {
    let response = app()
        .oneshot(
            Request::post("/admin/actions/delete-user")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("id=3&return_to=%2Fadmin%2Fuser"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn admin_api_without_token_is_401_json() {
    let response = app()
        .oneshot(Request::get("/api/admin/users").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn upload_with_bad_bearer_is_401() {
    let response = app()
        .oneshot(
            Request::post("/api/admin/user/upload")
                .header(header::AUTHORIZATION, "Bearer garbage")
                .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
                .body(Body::from("--x--\r\n"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_profile_rejects_non_numeric_id() {
    let response = app()
        .oneshot(
            Request::get("/api/users/public?userId=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_page_shows_flash_error() {
    let response = app()
        .oneshot(
            Request::get("/login?error=Invalid%20username%20or%20password")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Invalid username or password"));
    assert!(html.contains("action=\"/login\""));
}

#[tokio::test]
async fn logout_clears_cookie_and_redirects() {
    let response = app()
        .oneshot(
            Request::post("/logout")
                .header(header::COOKIE, "roster_session=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(cookie.starts_with("roster_session="));
}

#[tokio::test]
async fn root_redirects_to_admin_page() {
    let response = app()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/user");
}

#[tokio::test]
async fn missing_media_file_is_404() {
    let response = app()
        .oneshot(
            Request::get("/media/avatars/nope.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
