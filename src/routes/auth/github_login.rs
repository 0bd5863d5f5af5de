use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore};
use tracing::error;

use crate::{
    models::user::OauthProvider,
    responses::JsonResponse,
    routes::auth::claims::Claims,
    services::oauth::github::{errors::GitHubAuthError, models::GitHubCallback},
    state::AppState,
    utils::jwt::create_jwt,
};

/// Redirects to GitHub's OAuth authorization page with CSRF protection
pub async fn github_login(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let mut csrf_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut csrf_bytes);
    let csrf_token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(csrf_bytes);

    let state_cookie = Cookie::build(("oauth_state", csrf_token.clone()))
        .http_only(true)
        .secure(state.config.auth_cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::minutes(10))
        .build();

    let github = &state.config.oauth.github;
    let scope = "read:user user:email";

    let github_url = format!(
        "https://github.com/login/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}",
        github.client_id,
        urlencoding::encode(&github.redirect_uri),
        urlencoding::encode(scope),
        csrf_token,
    );

    (jar.add(state_cookie), Redirect::to(&github_url))
}

/// Handles the GitHub OAuth callback, validates state, and logs in/creates user
pub async fn github_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<GitHubCallback>,
) -> Response {
    let frontend_origin = state.config.frontend_origin.clone();

    let expected_state = match jar.get("oauth_state").map(|c| c.value().to_string()) {
        Some(value) => value,
        None => {
            return JsonResponse::redirect_to_login_with_error(
                &frontend_origin,
                &GitHubAuthError::MissingStateCookie.to_string(),
            )
            .into_response();
        }
    };

    if params.state != expected_state {
        return JsonResponse::redirect_to_login_with_error(
            &frontend_origin,
            &GitHubAuthError::InvalidState.to_string(),
        )
        .into_response();
    }

    let token = match state.github_oauth.exchange_code_for_token(&params.code).await {
        Ok(token) => token,
        Err(err) => {
            error!(?err, "github token exchange failed");
            return JsonResponse::redirect_to_login_with_error(
                &frontend_origin,
                &GitHubAuthError::TokenExchangeFailed.to_string(),
            )
            .into_response();
        }
    };

    let user_info = match state.github_oauth.fetch_user_info(&token).await {
        Ok(info) => info,
        Err(err) => {
            error!(?err, "github user info fetch failed");
            return JsonResponse::redirect_to_login_with_error(
                &frontend_origin,
                &err.to_string(),
            )
            .into_response();
        }
    };

    let user = match state.db.find_user_by_email(&user_info.email).await {
        Ok(Some(user)) => match user.oauth_provider {
            Some(OauthProvider::Github) => user,

            None | Some(OauthProvider::Email) => {
                return JsonResponse::redirect_to_login_with_error(
                    &frontend_origin,
                    "This account was created using email/password. Please log in with email.",
                )
                .into_response();
            }

            Some(other) => {
                return JsonResponse::redirect_to_login_with_error(
                    &frontend_origin,
                    &format!(
                        "This account is linked to {}. Please use that provider to log in.",
                        other
                    ),
                )
                .into_response();
            }
        },

        Ok(None) => {
            match state
                .db
                .create_user_with_oauth(
                    &user_info.email,
                    &user_info.first_name,
                    &user_info.last_name,
                    OauthProvider::Github,
                )
                .await
            {
                Ok(new_user) => new_user,
                Err(err) => {
                    error!(?err, "failed to create user from github oauth");
                    return JsonResponse::redirect_to_login_with_error(
                        &frontend_origin,
                        &GitHubAuthError::UserCreationFailed.to_string(),
                    )
                    .into_response();
                }
            }
        }

        Err(err) => {
            error!(?err, "failed to look up user during github oauth");
            return JsonResponse::redirect_to_login_with_error(&frontend_origin, "Database error")
                .into_response();
        }
    };

    let expires_in = Duration::days(7);
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

    let token = match create_jwt(
        claims,
        &state.jwt_keys,
        &state.config.jwt_issuer,
        &state.config.jwt_audience,
    ) {
        Ok(token) => token,
        Err(err) => {
            error!(?err, "failed to create session token after oauth login");
            return JsonResponse::redirect_to_login_with_error(
                &frontend_origin,
                "Token generation failed",
            )
            .into_response();
        }
    };

    let cookie = Cookie::build(("auth_token", token))
        .http_only(true)
        .secure(state.config.auth_cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(expires_in.num_seconds()))
        .build();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string()).unwrap(),
    );

    (headers, Redirect::to(&frontend_origin)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::db::mock_db::{MemBillingRepository, MockDb};
    use crate::services::billing::MockPolarService;
    use crate::services::challenge_store::ChallengeStore;
    use crate::services::judge::MockJudge;
    use crate::state::test_state;

    fn app() -> Router {
        let state = test_state(
            Arc::new(MockDb::default()),
            Arc::new(MemBillingRepository::default()),
            Arc::new(MockPolarService::new()),
            Arc::new(MockJudge::passing()),
            Arc::new(ChallengeStore::from_challenges([])),
        );
        Router::new()
            .route("/github-login", get(github_login))
            .route("/github-callback", get(github_callback))
            .with_state(state)
    }

    #[tokio::test]
    async fn login_redirects_to_github_and_sets_state_cookie() {
        let res = app()
            .oneshot(
                Request::get("/github-login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers().get("location").unwrap().to_str().unwrap();
        assert!(location.starts_with("https://github.com/login/oauth/authorize"));
        assert!(location.contains("client_id=client"));

        let cookie = res.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.starts_with("oauth_state="));
    }

    #[tokio::test]
    async fn callback_without_state_cookie_redirects_to_signin_with_error() {
        let res = app()
            .oneshot(
                Request::get("/github-callback?code=abc&state=whatever")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers().get("location").unwrap().to_str().unwrap();
        assert!(location.starts_with("https://app.example.com/signin?error="));
    }

    #[tokio::test]
    async fn callback_with_mismatched_state_is_rejected() {
        let res = app()
            .oneshot(
                Request::get("/github-callback?code=abc&state=attacker")
                    .header("cookie", "oauth_state=expected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers().get("location").unwrap().to_str().unwrap();
        assert!(location.contains("error="));
    }
}
