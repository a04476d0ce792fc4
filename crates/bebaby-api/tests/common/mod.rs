#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use bebaby_api::auth::{create_token, hash_password};
use bebaby_api::{ApiConfig, AppState, AppStateInner, router};
use bebaby_db::{Database, NewUser};
use bebaby_security::rate_limit::RateLimiters;
use bebaby_types::models::{User, UserType};

pub const SECRET: &str = "test-secret-0123456789abcdef";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const USER_PASSWORD: &str = "user-password";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limits(RateLimiters::default())
    }

    pub fn with_limits(limiters: RateLimiters) -> Self {
        Self::build(limiters, false)
    }

    pub fn behind_proxy(limiters: RateLimiters) -> Self {
        Self::build(limiters, true)
    }

    fn build(limiters: RateLimiters, trust_proxy: bool) -> Self {
        let config = ApiConfig {
            jwt_secret: SECRET.to_string(),
            upload_dir: std::env::temp_dir().join(format!("bebaby-test-{}", Uuid::new_v4())),
            secure_cookies: false,
            trust_proxy,
        };
        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::new(db, limiters, config);
        let router = router(state.clone());
        Self { state, router }
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub fn seed_user(&self, username: &str, state: Option<&str>) -> User {
        let mut new = NewUser::new(
            &format!("{username}@example.com"),
            username,
            &hash_password(USER_PASSWORD).unwrap(),
            UserType::SugarBaby,
        );
        new.state = state.map(str::to_string);
        self.state.db.create_user(&new).unwrap()
    }

    pub fn seed_admin(&self, username: &str) -> User {
        let mut new = NewUser::new(
            &format!("{username}@example.com"),
            username,
            &hash_password(ADMIN_PASSWORD).unwrap(),
            UserType::SugarDaddy,
        );
        new.is_admin = true;
        self.state.db.create_user(&new).unwrap()
    }

    pub fn token_for(&self, user: &User) -> String {
        create_token(SECRET, user.id, &user.username).unwrap()
    }

    /// Log in and return the `admin_session=...` cookie pair.
    pub async fn admin_login(&self, username: &str) -> String {
        let res = self
            .send(json(
                Method::POST,
                "/admin/login",
                serde_json::json!({ "username": username, "password": ADMIN_PASSWORD }),
            ))
            .await;
        assert_eq!(res.status, StatusCode::OK, "admin login failed: {:?}", res.body);
        cookie_pair(&res.headers, "admin_session").expect("admin_session cookie")
    }

    pub async fn csrf(&self, cookie: &str) -> String {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/admin/csrf")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let res = self.send(req).await;
        assert_eq!(res.status, StatusCode::OK);
        res.body["csrfToken"].as_str().unwrap().to_string()
    }

    pub fn report(&self, reporter: &User, reported: &User) -> String {
        self.state
            .db
            .create_report(reporter.id, &reported.id.to_string(), "spam")
            .unwrap()
            .id
            .to_string()
    }
}

/// `name=value` from the first matching `set-cookie` header.
pub fn cookie_pair(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Admin request with the session cookie and, when given, a CSRF token.
pub fn admin_json(
    method: Method,
    uri: &str,
    cookie: &str,
    csrf: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, cookie);
    if let Some(token) = csrf {
        builder = builder.header("x-csrf-token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn admin_get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// User request with a bearer token.
pub fn user_json(method: Method, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn user_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}
