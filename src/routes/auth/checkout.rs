use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{error, info};

use crate::responses::JsonResponse;
use crate::routes::auth::session::AuthSession;
use crate::services::billing::CreateCheckoutRequest;
use crate::state::AppState;

/// Creates a provider checkout session for the configured product and sends
/// the user there. The gate redirects unsubscribed users to this route.
pub async fn handle_checkout(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(slug): Path<String>,
) -> Response {
    let polar = &state.config.polar;
    if slug != polar.product_slug {
        return JsonResponse::not_found("Unknown product").into_response();
    }

    // Success URLs are configured relative to the frontend.
    let success_url = if polar.success_url.starts_with('/') {
        format!("{}{}", state.config.frontend_origin, polar.success_url)
    } else {
        polar.success_url.clone()
    };

    let req = CreateCheckoutRequest {
        product_id: polar.product_id.clone(),
        success_url,
        external_customer_id: Some(claims.id.clone()),
        customer_email: Some(claims.email.clone()),
    };

    match state.billing.create_checkout_session(req).await {
        Ok(session) => match session.url {
            Some(url) => {
                info!(user_id = %claims.id, checkout_id = %session.id, "redirecting to checkout");
                Redirect::to(&url).into_response()
            }
            None => {
                error!(checkout_id = %session.id, "checkout session has no redirect url");
                JsonResponse::server_error("Checkout session has no URL").into_response()
            }
        },
        Err(err) => {
            error!(?err, user_id = %claims.id, "failed to create checkout session");
            JsonResponse::server_error("Failed to start checkout").into_response()
        }
    }
}
