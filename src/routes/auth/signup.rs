use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::models::{signup::SignupPayload, user::OauthProvider};
use crate::responses::JsonResponse;
use crate::state::AppState;
use crate::utils::password::hash_password;

const MIN_PASSWORD_LENGTH: usize = 8;

pub async fn handle_signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Response {
    let mut payload = payload;
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || !payload.email.contains('@') {
        return JsonResponse::bad_request("A valid email address is required").into_response();
    }
    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return JsonResponse::bad_request("Password must be at least 8 characters").into_response();
    }

    match state.db.is_email_taken(&payload.email).await {
        Ok(true) => return JsonResponse::conflict("User already registered").into_response(),
        Ok(false) => {}
        Err(err) => {
            error!(?err, "failed to check email availability");
            return JsonResponse::server_error("Database error").into_response();
        }
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!(?err, "failed to hash password");
            return JsonResponse::server_error("Internal error").into_response();
        }
    };

    match state
        .db
        .create_user(&payload, &password_hash, OauthProvider::Email)
        .await
    {
        Ok(user_id) => {
            tracing::info!(%user_id, "created account");
            JsonResponse::success("Account created").into_response()
        }
        Err(err) => {
            error!(?err, "failed to create user");
            JsonResponse::server_error("Failed to create account").into_response()
        }
    }
}
