use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use revforum::{
    app::build_app,
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    config::AppConfig,
    db::RepoError,
    forum::repo::ForumRepo,
    memory::MemoryStore,
    state::AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn config() -> AppConfig {
    let config = AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-secret-at-least-32-bytes!".into()),
        _ => None,
    })
    .unwrap();
    assert!(config.database_url.is_none());
    config
}

fn app() -> Router {
    build_app(AppState::in_memory(config()))
}

/// User store whose every call fails like an unreachable database.
struct UnreachableUsers;

fn unreachable() -> RepoError {
    RepoError::Backend(anyhow::anyhow!("connection refused at 10.0.0.5:5432"))
}

#[async_trait]
impl UserRepo for UnreachableUsers {
    async fn find_by_id(&self, _: i64) -> Result<Option<User>, RepoError> {
        Err(unreachable())
    }
    async fn find_by_username(&self, _: &str) -> Result<Option<User>, RepoError> {
        Err(unreachable())
    }
    async fn find_by_username_or_email(&self, _: &str, _: &str) -> Result<Option<User>, RepoError> {
        Err(unreachable())
    }
    async fn create(&self, _: NewUser) -> Result<User, RepoError> {
        Err(unreachable())
    }
    async fn list(&self) -> Result<Vec<User>, RepoError> {
        Err(unreachable())
    }
}

/// Pre-check finds nothing but the insert trips the unique constraint.
struct RacedUsers;

#[async_trait]
impl UserRepo for RacedUsers {
    async fn find_by_id(&self, _: i64) -> Result<Option<User>, RepoError> {
        Ok(None)
    }
    async fn find_by_username(&self, _: &str) -> Result<Option<User>, RepoError> {
        Ok(None)
    }
    async fn find_by_username_or_email(&self, _: &str, _: &str) -> Result<Option<User>, RepoError> {
        Ok(None)
    }
    async fn create(&self, _: NewUser) -> Result<User, RepoError> {
        Err(RepoError::Conflict("A user with this username or email already exists".into()))
    }
    async fn list(&self) -> Result<Vec<User>, RepoError> {
        Ok(Vec::new())
    }
}

fn app_with_users(users: Arc<dyn UserRepo>) -> Router {
    let forum = Arc::new(MemoryStore::default()) as Arc<dyn ForumRepo>;
    build_app(AppState::from_parts(users, forum, config()))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let set_cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, set_cookie, body)
}

fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` pair of a `Set-Cookie` header, ready to send back.
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}

async fn register(app: &Router, username: &str, email: &str, password: &str) -> Value {
    let (status, _, body) = send(
        app,
        post_json(
            "/api/register",
            json!({"username": username, "email": email, "password": password}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, set_cookie, _) = send(
        app,
        post_json(
            "/api/login",
            json!({"username": username, "password": password}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    cookie_pair(&set_cookie.unwrap())
}

#[tokio::test]
async fn session_lifecycle() {
    let app = app();

    let body = register(&app, "alice", "a@x.com", "secret1").await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "a@x.com");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
    let id = body["id"].as_i64().unwrap();

    let (status, set_cookie, body) = send(
        &app,
        post_json(
            "/api/login",
            json!({"username": "alice", "password": "secret1"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["id"], id);
    let set_cookie = set_cookie.unwrap();
    assert!(set_cookie.starts_with("Authorization="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=2592000"));
    let cookie = cookie_pair(&set_cookie);

    let (status, _, body) = send(&app, get("/api/login/validate", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], id);

    let (status, removal, body) = send(&app, post_json("/api/login/logout", json!({}), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out");
    let removal = removal.unwrap();
    assert!(removal.starts_with("Authorization=;"));
    assert!(removal.contains("Max-Age=0"));

    // logout only clears the client copy; the captured token keeps working
    let (status, _, _) = send(&app, get("/api/login/validate", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = app();
    register(&app, "alice", "a@x.com", "secret1").await;

    let (wrong_status, wrong_cookie, wrong_body) = send(
        &app,
        post_json(
            "/api/login",
            json!({"username": "alice", "password": "nope-nope"}),
            None,
        ),
    )
    .await;
    let (unknown_status, unknown_cookie, unknown_body) = send(
        &app,
        post_json(
            "/api/login",
            json!({"username": "mallory", "password": "nope-nope"}),
            None,
        ),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["error"], "Invalid username or password");
    assert!(wrong_cookie.is_none());
    assert!(unknown_cookie.is_none());
}

#[tokio::test]
async fn registration_is_validated() {
    let app = app();
    register(&app, "alice", "a@x.com", "secret1").await;

    for payload in [
        json!({"username": "alice", "email": "other@x.com", "password": "secret1"}),
        json!({"username": "alice2", "email": "A@X.com", "password": "secret1"}),
    ] {
        let (status, _, body) = send(&app, post_json("/api/register", payload, None)).await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");
    }

    for payload in [
        json!({"email": "b@x.com", "password": "secret1"}),
        json!({"username": "bob", "email": "bob-at-x", "password": "secret1"}),
        json!({"username": "bob", "email": "b@x.com", "password": "short"}),
    ] {
        let (status, _, body) = send(&app, post_json("/api/register", payload, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    let req = Request::post("/api/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gated_routes_need_a_valid_cookie() {
    let app = app();
    register(&app, "alice", "a@x.com", "secret1").await;

    for req in [
        get("/api/login/validate", None),
        get("/api/users", None),
        get("/api/login/validate", Some("Authorization=not.a.jwt")),
        post_json("/api/themes/create", json!({"title": "t", "status": "open"}), None),
    ] {
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid username or password");
    }

    let cookie = login(&app, "alice", "secret1").await;
    let (status, _, body) = send(&app, get("/api/users", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
    assert!(users[0].get("password_hash").is_none());
}

#[tokio::test]
async fn forum_hierarchy() {
    let app = app();
    let alice = register(&app, "alice", "a@x.com", "secret1").await;
    let cookie = login(&app, "alice", "secret1").await;
    let cookie = Some(cookie.as_str());

    let (status, _, body) = send(
        &app,
        post_json("/api/themes/create", json!({"title": "Rust", "status": "open"}), cookie),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Theme created");
    let theme_id = body["theme"]["id"].as_i64().unwrap();

    let (status, _, _) = send(
        &app,
        post_json("/api/themes/create", json!({"title": "Rust", "status": "open"}), cookie),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/themes/subthemes",
            json!({"title": "Async", "status": "open", "parent_id": 999}),
            cookie,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Parent theme not found");

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/themes/subthemes",
            json!({"title": "Async", "status": "open", "parent_id": theme_id}),
            cookie,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let sub_id = body["sub_theme"]["id"].as_i64().unwrap();

    let mut topic_ids = Vec::new();
    for title in ["Pinning", "Cancellation"] {
        let (status, _, body) = send(
            &app,
            post_json(
                "/api/themes/subthemes/topics",
                json!({"title": title, "sub_theme_id": sub_id}),
                cookie,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["topic"]["author_id"], alice["id"]);
        assert_eq!(body["topic"]["content"], "");
        topic_ids.push(body["topic"]["id"].as_i64().unwrap());
    }

    for content in ["first", "second"] {
        let (status, _, body) = send(
            &app,
            post_json(
                "/api/themes/subthemes/topics/posts",
                json!({"content": content, "topic_id": topic_ids[0]}),
                cookie,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["post"]["author_id"], alice["id"]);
    }

    let (status, _, body) = send(&app, get("/api/themes", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, _, body) = send(&app, get(&format!("/api/themes/{theme_id}/subthemes"), None)).await;
    assert_eq!(body[0]["title"], "Async");

    let (_, _, body) = send(
        &app,
        get(&format!("/api/themes/subthemes/{sub_id}/topics"), None),
    )
    .await;
    let topics = body.as_array().unwrap();
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0]["title"], "Cancellation");
    assert_eq!(topics[0]["post_count"], 0);
    assert_eq!(topics[1]["post_count"], 2);

    let (_, _, body) = send(
        &app,
        get(
            &format!("/api/themes/subthemes/topics/{}/posts", topic_ids[0]),
            None,
        ),
    )
    .await;
    let contents: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, ["first", "second"]);

    let (status, _, body) = send(&app, get("/api/themes/abc/subthemes", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn store_outage_is_a_generic_500() {
    let app = app_with_users(Arc::new(UnreachableUsers));

    for req in [
        post_json(
            "/api/register",
            json!({"username": "alice", "email": "a@x.com", "password": "secret1"}),
            None,
        ),
        post_json(
            "/api/login",
            json!({"username": "alice", "password": "secret1"}),
            None,
        ),
    ] {
        let (status, set_cookie, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(set_cookie.is_none());
    }
}

#[tokio::test]
async fn registration_race_loser_gets_409() {
    let app = app_with_users(Arc::new(RacedUsers));
    let (status, _, body) = send(
        &app,
        post_json(
            "/api/register",
            json!({"username": "alice", "email": "a@x.com", "password": "secret1"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "A user with this username or email already exists");
}
