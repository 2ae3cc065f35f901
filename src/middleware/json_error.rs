use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::response::error_response;

const MALFORMED_INPUT: &str = "Invalid request body";

/// Rewrites error responses that are not already JSON (axum extractor
/// rejections, unmatched routes) into the `{ "error": ... }` shape.
/// Extractor details are replaced by a generic message.
pub async fn json_error_middleware(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let status = response.status();

    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    if is_json_response(&response) {
        return response;
    }

    let (parts, _body) = response.into_parts();
    let (status, message) = normalize(status);
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), "non-json error response");
    }

    let mut new_response = error_response(status, message);
    copy_headers(&parts.headers, &mut new_response);
    new_response
}

fn normalize(status: StatusCode) -> (StatusCode, String) {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNPROCESSABLE_ENTITY
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::PAYLOAD_TOO_LARGE => (StatusCode::BAD_REQUEST, MALFORMED_INPUT.to_string()),
        _ if status.is_server_error() => (
            StatusCode::INTERNAL_SERVER_ERROR,
            crate::error::INTERNAL_MESSAGE.to_string(),
        ),
        _ => (status, default_message(status)),
    }
}

fn is_json_response(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let value = value.to_ascii_lowercase();
            value.contains("application/json") || value.contains("+json")
        })
        .unwrap_or(false)
}

fn default_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

fn copy_headers(src: &HeaderMap, dest: &mut Response) {
    for (name, value) in src {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        dest.headers_mut().insert(name.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Json, Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        middleware,
        routing::post,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::json_error_middleware;
    use crate::response::ErrorBody;

    #[derive(Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    async fn echo(Json(_): Json<Payload>) -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new()
            .route("/echo", post(echo))
            .layer(middleware::from_fn(json_error_middleware))
    }

    #[tokio::test]
    async fn malformed_json_becomes_generic_400() {
        let response = app()
            .oneshot(
                Request::post("/echo")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Invalid request body");
    }

    #[tokio::test]
    async fn missing_field_becomes_generic_400() {
        let response = app()
            .oneshot(
                Request::post("/echo")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let response = app()
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Not Found");
    }
}
