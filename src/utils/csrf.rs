use axum::{
    body::Body,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Cookie;
use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use rand_core::RngCore;

/// Double-submit CSRF check for unsafe methods: the `x-csrf-token` header must
/// match the `csrf_token` cookie.
pub async fn validate_csrf(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    if matches!(
        req.method(),
        &Method::POST | &Method::PUT | &Method::DELETE | &Method::PATCH
    ) {
        let headers = req.headers();

        let token_header = headers.get("x-csrf-token").and_then(|v| v.to_str().ok());

        let cookie_header = req
            .headers()
            .get_all("cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");

        if let Some(csrf_token) = token_header {
            if let Some(cookie_token) = extract_csrf_from_cookie(&cookie_header) {
                if csrf_token == cookie_token {
                    return Ok(next.run(req).await);
                }
            }
        }
        Err(StatusCode::FORBIDDEN)
    } else {
        Ok(next.run(req).await)
    }
}

fn extract_csrf_from_cookie(cookie_str: &str) -> Option<String> {
    for cookie in cookie_str.split(';') {
        if let Ok(parsed) = Cookie::parse_encoded(cookie.trim()) {
            if parsed.name() == "csrf_token" {
                return Some(parsed.value().to_string());
            }
        }
    }
    None
}

pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32]; // 256-bit token
    rand_core::OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn get_csrf_token() -> Response {
    let token = generate_csrf_token();

    let set_cookie_value = format!(
        "csrf_token={}; Path=/; SameSite=Strict; HttpOnly; Secure",
        token
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&set_cookie_value).unwrap(),
    );

    // Return the token in the body in case the frontend needs it, with headers
    (StatusCode::OK, headers, token).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware, routing::post, Router};
    use tower::ServiceExt;

    fn protected_app() -> Router {
        Router::new()
            .route("/submit", post(|| async { "ok" }))
            .layer(middleware::from_fn(validate_csrf))
    }

    #[tokio::test]
    async fn post_without_token_is_forbidden() {
        let res = protected_app()
            .oneshot(Request::post("/submit").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn post_with_matching_header_and_cookie_passes() {
        let token = generate_csrf_token();
        let res = protected_app()
            .oneshot(
                Request::post("/submit")
                    .header("x-csrf-token", &token)
                    .header("cookie", format!("csrf_token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_with_mismatched_token_is_forbidden() {
        let res = protected_app()
            .oneshot(
                Request::post("/submit")
                    .header("x-csrf-token", "aaaa")
                    .header("cookie", "csrf_token=bbbb")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
