//! Shared harness for the router integration tests
//!
//! Drives the real router in-process against an in-memory SQLite database
//! and carries the session cookie between requests like a browser would.

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use common::database::{DatabaseConfig, init_pool};
use dinnerclub::{
    AppConfig, AppState, create_router, database::migrate_schema, jwt::JwtConfig,
    password::PasswordConfig,
};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub const PASSWORD: &str = "correcthorsebattery";

pub fn test_config() -> AppConfig {
    AppConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        log_level: "debug".to_string(),
        city_code: "pdx".to_string(),
        referral_code: None,
        session_secret: "integration-test-session-secret-0123456789".to_string(),
        session_ttl_seconds: 3600,
        secure_cookies: false,
        jwt: JwtConfig {
            access_token_secret: "integration-access-secret".to_string(),
            refresh_token_secret: "integration-refresh-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
        },
        password: PasswordConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        database: DatabaseConfig::in_memory(),
    }
}

/// A response with its body already collected
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Flash messages rendered on this page
    pub fn messages(&self) -> Vec<String> {
        self.json()["messages"]
            .as_array()
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|m| m.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One browser talking to one application instance
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
    pub pool: SqlitePool,
}

impl TestClient {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let pool = init_pool(&config.database).await.unwrap();
        migrate_schema(&pool).await.unwrap();
        let state = AppState::new(pool.clone(), &config).unwrap();

        Self {
            router: create_router(state),
            cookie: None,
            pool,
        }
    }

    /// A second browser against the same application, without cookies
    pub fn fresh_browser(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookie: None,
            pool: self.pool.clone(),
        }
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_with_bearer(&mut self, uri: &str, token: &str) -> TestResponse {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_form(&mut self, uri: &str, form: &str) -> TestResponse {
        self.send(form_request(uri, form, false)).await
    }

    /// Post a form but ask for JSON status codes instead of redirects
    pub async fn post_form_json(&mut self, uri: &str, form: &str) -> TestResponse {
        self.send(form_request(uri, form, true)).await
    }

    pub async fn post_json(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn register(&mut self, username: &str) -> TestResponse {
        self.post_form(
            "/auth/register",
            &format!("username={}&password={}", username, PASSWORD),
        )
        .await
    }

    pub async fn login(&mut self, username: &str) -> TestResponse {
        self.post_form(
            "/auth/login",
            &format!("username={}&password={}", username, PASSWORD),
        )
        .await
    }

    /// Register and log in, leaving the flash queue empty
    pub async fn sign_in(&mut self, username: &str) {
        assert_eq!(self.register(username).await.status, StatusCode::FOUND);
        assert_eq!(self.login(username).await.status, StatusCode::FOUND);
        self.get("/profile").await;
    }
}

fn form_request(uri: &str, form: &str, json: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if json {
        builder = builder.header(header::ACCEPT, "application/json");
    }
    builder.body(Body::from(form.to_string())).unwrap()
}
