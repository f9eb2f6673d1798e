//! HTTP-level tests of the dashboard router
//!
//! Requests go straight into the router with `oneshot`; no socket is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{
        Request, Response, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
};
use feedboard_feed::{FeedId, SyntheticFeedConfig};
use feedboard_server::{AppState, ServerConfig, router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";

struct TestApp {
    state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        feedboard_logging::init_testing();

        let mut config = ServerConfig::default();
        config.feeds.line = SyntheticFeedConfig::line()
            .with_count(3)
            .with_delay(Duration::from_millis(10))
            .with_poll_interval(Duration::from_millis(5));
        config.feeds.bar = SyntheticFeedConfig::bar()
            .with_count(2)
            .with_delay(Duration::from_millis(10))
            .with_poll_interval(Duration::from_millis(5));
        config.feeds.messages.poll_interval_ms = 20;

        let state = AppState::new(config).unwrap();
        let router = router(Arc::clone(&state));
        Self { state, router }
    }

    /// Cookie header for a fresh session of `username`
    fn login_as(&self, username: &str) -> String {
        let token = self.state.sessions.create(username);
        format!("feedboard_session={}", token)
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::get(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::post(uri).header(CONTENT_TYPE, FORM);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(request.body(Body::from(body.to_string())).unwrap()).await
    }
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Next data frame of a streaming body
async fn next_chunk(body: &mut Body) -> String {
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("no frame within timeout")
        .expect("stream ended")
        .unwrap();
    String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap()
}

fn assert_login_redirect(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "/login");
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_signup_login_logout_flow() {
    let app = TestApp::new();

    let response = app.post_form("/signup", "username=alice&password=pw1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"success": true, "message": "Signup successful"})
    );

    let response = app.post_form("/signup", "username=alice&password=other", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"success": false, "message": "Username already exists"})
    );

    let response = app.post_form("/login", "username=alice&password=wrong", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid username or password");

    let response = app.post_form("/login", "username=alice&password=pw1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert_eq!(body_json(response).await["message"], "Login successful");

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("<strong>alice</strong>"));

    let response = app.get("/logout", Some(&cookie)).await;
    assert_login_redirect(&response);
    assert!(app.state.sessions.is_empty());

    let response = app.get("/", Some(&cookie)).await;
    assert_login_redirect(&response);
}

#[tokio::test]
async fn test_signup_requires_all_fields() {
    let app = TestApp::new();
    for body in ["username=&password=x", "username=bob", ""] {
        let response = app.post_form("/signup", body, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"success": false, "message": "Fill all fields"})
        );
    }
    assert!(app.state.users.is_empty());
}

#[tokio::test]
async fn test_login_unknown_user() {
    let app = TestApp::new();
    let response = app.post_form("/login", "username=ghost&password=x", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_dashboard_escapes_username() {
    let app = TestApp::new();
    let cookie = app.login_as("<b>eve</b>");
    let html = body_text(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains("&lt;b&gt;eve&lt;/b&gt;"));
    assert!(!html.contains("<b>eve</b>"));
}

// ============================================================================
// Pages and API
// ============================================================================

#[tokio::test]
async fn test_public_pages_and_assets() {
    let app = TestApp::new();
    for uri in ["/login", "/signup", "/assets/js/auth.js", "/assets/css/style.css"] {
        assert_eq!(app.get(uri, None).await.status(), StatusCode::OK, "{}", uri);
    }
    assert_eq!(
        app.get("/assets/js/nope.js", None).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_protected_routes_redirect_without_session() {
    let app = TestApp::new();
    for uri in [
        "/",
        "/api/data",
        "/api/feeds",
        "/stream",
        "/chart-stream-line",
        "/chart-stream-bar",
    ] {
        assert_login_redirect(&app.get(uri, None).await);
        assert_login_redirect(&app.get(uri, Some("feedboard_session=forged")).await);
    }
    assert_eq!(app.state.registry.subscriber_count(FeedId::Messages), 0);
}

#[tokio::test]
async fn test_api_endpoints() {
    let app = TestApp::new();
    let cookie = app.login_as("alice");

    let response = app.get("/api/data", Some(&cookie)).await;
    assert_eq!(
        body_json(response).await,
        json!({"items": ["Rust", "Axum", "Frontend", "Backend"]})
    );

    let response = app.post_form("/api/submit", "name=Ferris", Some(&cookie)).await;
    assert_eq!(body_json(response).await, json!({"message": "Received Ferris"}));
}

// ============================================================================
// Feeds
// ============================================================================

#[tokio::test]
async fn test_send_then_stream_delivers_history() {
    let app = TestApp::new();
    let cookie = app.login_as("alice");

    let response = app.post_form("/send", "message=hello", Some(&cookie)).await;
    assert_eq!(body_json(response).await, json!({"status": "ok"}));

    let response = app.get("/stream", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");
    assert_eq!(response.headers()["cache-control"], "no-cache");

    let mut body = response.into_body();
    assert_eq!(next_chunk(&mut body).await, "data: hello\n\n");

    app.post_form("/send", "message=second", Some(&cookie)).await;
    assert_eq!(next_chunk(&mut body).await, "data: second\n\n");
}

#[tokio::test]
async fn test_empty_send_is_ok_and_not_published() {
    let app = TestApp::new();
    let cookie = app.login_as("alice");

    let response = app.post_form("/send", "message=", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
    assert!(app.state.registry.messages().log().is_empty());
}

#[tokio::test]
async fn test_unauthorized_send_is_refused() {
    let app = TestApp::new();
    let response = app.post_form("/send", "message=spam", None).await;
    assert_login_redirect(&response);
    assert!(app.state.registry.messages().log().is_empty());
}

/// The session check runs before the body is parsed
#[tokio::test]
async fn test_unauthorized_send_redirects_before_parsing_body() {
    let app = TestApp::new();
    let request = Request::post("/send")
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from("not a form"))
        .unwrap();

    assert_login_redirect(&app.send(request).await);
    assert!(app.state.registry.messages().log().is_empty());
}

#[tokio::test]
async fn test_line_chart_streams_full_series_then_ends() {
    let app = TestApp::new();
    let cookie = app.login_as("alice");

    let response = app.get("/chart-stream-line", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = tokio::time::timeout(Duration::from_secs(5), body_text(response))
        .await
        .expect("chart stream did not end");
    assert_eq!(
        text,
        concat!(
            "data: {\"label\":\"Point 1\",\"value\":12}\n\n",
            "data: {\"label\":\"Point 2\",\"value\":19}\n\n",
            "data: {\"label\":\"Point 3\",\"value\":26}\n\n",
        )
    );
}

#[tokio::test]
async fn test_named_feed_route() {
    let app = TestApp::new();
    let cookie = app.login_as("alice");

    let response = app.get("/feeds/bar", Some(&cookie)).await;
    let text = tokio::time::timeout(Duration::from_secs(5), body_text(response))
        .await
        .unwrap();
    assert!(text.starts_with("data: {\"label\":\"BPoint 1\",\"value\":5}\n\n"));

    let response = app.get("/feeds/pie", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dropped_stream_detaches_subscriber() {
    let app = TestApp::new();
    let cookie = app.login_as("alice");

    let response = app.get("/stream", Some(&cookie)).await;
    assert_eq!(app.state.registry.subscriber_count(FeedId::Messages), 1);

    let status = body_json(app.get("/api/feeds", Some(&cookie)).await).await;
    assert_eq!(status["messages"]["subscribers"], 1);

    drop(response);
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.state.registry.subscriber_count(FeedId::Messages) > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscriber never detached");
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let app = TestApp::new();
    let cookie = app.login_as("alice");

    let response = app.get("/stream", Some(&cookie)).await;
    app.state.registry.shutdown();

    let text = tokio::time::timeout(Duration::from_secs(5), body_text(response))
        .await
        .expect("stream stayed open after shutdown");
    assert!(text.is_empty());
}
