use crate::routes::auth::claims::Claims;
use crate::{
    responses::JsonResponse,
    state::AppState,
    utils::{jwt::create_jwt, password::verify_password},
};

use axum::{
    extract::{Json, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, to_value};
use time::Duration as TimeDuration;
use tracing::error;
use uuid::Uuid;

use super::session::AuthSession;

#[derive(Deserialize, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

pub async fn handle_login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let user = app_state.db.find_user_by_email(&payload.email).await;
    let user = match user {
        Ok(Some(record)) => record,
        Ok(None) => return JsonResponse::unauthorized("Invalid credentials").into_response(),
        Err(err) => {
            error!(?err, "failed to look up user for login");
            return JsonResponse::server_error("Database error").into_response();
        }
    };

    if user.password_hash.trim().is_empty() {
        let provider_name = user
            .oauth_provider
            .map(|p| p.to_string())
            .unwrap_or("an OAuth provider".to_string());
        return JsonResponse::unauthorized(&format!(
            "This account was created with {} login. Please use that provider to sign in.",
            provider_name
        ))
        .into_response();
    }

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {
            let expires_in = if payload.remember {
                Duration::days(30)
            } else {
                Duration::days(7)
            };

            let claims = Claims {
                id: user.id.to_string(),
                email: user.email.clone(),
                exp: (Utc::now() + expires_in).timestamp() as usize,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                role: user.role,
                iss: String::new(),
                aud: String::new(),
            };

            match create_jwt(
                claims,
                &app_state.jwt_keys,
                &app_state.config.jwt_issuer,
                &app_state.config.jwt_audience,
            ) {
                Ok(token) => {
                    let cookie = Cookie::build(("auth_token", token))
                        .http_only(true)
                        .secure(app_state.config.auth_cookie_secure)
                        .same_site(SameSite::Lax)
                        .path("/")
                        .max_age(TimeDuration::seconds(expires_in.num_seconds()))
                        .build();

                    let mut headers = HeaderMap::new();
                    headers.insert(
                        header::SET_COOKIE,
                        HeaderValue::from_str(&cookie.to_string()).unwrap(),
                    );
                    let user_json = to_value(&user).expect("User serialization failed");
                    (
                        StatusCode::OK,
                        headers,
                        Json(json!({
                            "success": true,
                            "user": user_json,
                        })),
                    )
                        .into_response()
                }
                Err(err) => {
                    error!(?err, "failed to create session token");
                    JsonResponse::server_error("Token generation failed").into_response()
                }
            }
        }
        Ok(false) => JsonResponse::unauthorized("Invalid credentials").into_response(),
        Err(err) => {
            error!(?err, "password verification error");
            JsonResponse::server_error("Internal error").into_response()
        }
    }
}

pub async fn handle_me(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Response {
    let user_id = match Uuid::parse_str(&claims.id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid session").into_response(),
    };

    match app_state.db.find_public_user_by_id(user_id).await {
        Ok(Some(user)) => Json(json!({ "user": user })).into_response(),
        Ok(None) => JsonResponse::unauthorized("User no longer exists").into_response(),
        Err(err) => {
            error!(?err, %user_id, "failed to load user for /me");
            JsonResponse::server_error("Database error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::post,
        Router,
    };
    use time::OffsetDateTime;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::db::mock_db::{MemBillingRepository, MockDb};
    use crate::models::user::{OauthProvider, User, UserRole};
    use crate::services::billing::MockPolarService;
    use crate::services::challenge_store::ChallengeStore;
    use crate::services::judge::MockJudge;
    use crate::state::test_state;
    use crate::utils::password::hash_password;

    fn user_with_password(password: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".into(),
            password_hash: hash_password(password).unwrap(),
            first_name: "Test".into(),
            last_name: "User".into(),
            role: Some(UserRole::User),
            oauth_provider: Some(OauthProvider::Email),
            customer_id: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn app(db: MockDb) -> Router {
        let state = test_state(
            Arc::new(db),
            Arc::new(MemBillingRepository::default()),
            Arc::new(MockPolarService::new()),
            Arc::new(MockJudge::passing()),
            Arc::new(ChallengeStore::from_challenges([])),
        );
        Router::new()
            .route("/login", post(handle_login))
            .with_state(state)
    }

    async fn login(app: Router, body: serde_json::Value) -> axum::response::Response {
        app.oneshot(
            Request::post("/login")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn valid_credentials_set_the_auth_cookie() {
        let db = MockDb {
            find_user_result: Some(user_with_password("hunter2hunter2")),
            ..Default::default()
        };

        let res = login(
            app(db),
            serde_json::json!({ "email": "test@example.com", "password": "hunter2hunter2" }),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res
            .headers()
            .get("set-cookie")
            .expect("login should set a cookie")
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("auth_token="));
        assert!(set_cookie.contains("HttpOnly"));

        let body = to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        // password hash never leaves the server
        assert!(json["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let db = MockDb {
            find_user_result: Some(user_with_password("hunter2hunter2")),
            ..Default::default()
        };

        let res = login(
            app(db),
            serde_json::json!({ "email": "test@example.com", "password": "nope" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_email_is_unauthorized() {
        let res = login(
            app(MockDb::default()),
            serde_json::json!({ "email": "ghost@example.com", "password": "whatever" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn oauth_account_cannot_password_login() {
        let mut user = user_with_password("irrelevant");
        user.password_hash = String::new();
        user.oauth_provider = Some(OauthProvider::Github);
        let db = MockDb {
            find_user_result: Some(user),
            ..Default::default()
        };

        let res = login(
            app(db),
            serde_json::json!({ "email": "test@example.com", "password": "whatever" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().contains("GitHub"));
    }

    #[tokio::test]
    async fn db_failure_is_a_server_error() {
        let db = MockDb {
            should_fail: true,
            ..Default::default()
        };

        let res = login(
            app(db),
            serde_json::json!({ "email": "test@example.com", "password": "whatever" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
