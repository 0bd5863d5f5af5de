use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration as TimeDuration;

use crate::responses::JsonResponse;

pub async fn handle_logout() -> impl IntoResponse {
    let expired_cookie = Cookie::build(("auth_token", ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(0));

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&expired_cookie.to_string()).unwrap(),
    );

    (StatusCode::OK, headers, JsonResponse::success("Logged out"))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    use crate::routes::auth::logout::handle_logout;

    #[tokio::test]
    async fn test_logout_clears_auth_cookie_and_returns_success() {
        let app = Router::new().route("/logout", post(handle_logout));

        let res = app
            .oneshot(
                Request::post("/logout")
                    .header("Content-Type", "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);

        let set_cookie = res
            .headers()
            .get("set-cookie")
            .expect("logout should clear the cookie")
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("auth_token="));
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
