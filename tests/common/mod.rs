#![allow(dead_code)]

use axum::{
    Router,
    body::{self, Body},
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use storefront_auth::routes::API_PREFIX;

pub fn api_path(path: &str) -> String {
    format!("{API_PREFIX}{path}")
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

    /// Value of a `Set-Cookie` for `name`, if one was sent.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| raw.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn json(method: &str, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(api_path(path))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(api_path(path))
        .body(Body::empty())
        .expect("request")
}

pub fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().expect("header"),
    );
    request
}

pub fn with_cookie(mut request: Request<Body>, name: &str, value: &str) -> Request<Body> {
    request.headers_mut().append(
        header::COOKIE,
        format!("{name}={value}").parse().expect("header"),
    );
    request
}

pub async fn sign_in(router: &Router, email: &str, password: &str) -> TestResponse {
    send(
        router,
        json(
            "POST",
            "/auth/sign-in",
            serde_json::json!({ "email": email, "password": password }),
        ),
    )
    .await
}
