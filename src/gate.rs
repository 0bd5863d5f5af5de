use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use crate::routes::auth::session::session_from_headers;
use crate::state::AppState;

/// Paths that bypass the gate entirely: auth pages, the API surface (which
/// carries its own auth), the provider webhook, and the post-checkout landing
/// page.
const PUBLIC_PREFIXES: &[&str] = &[
    "/signin",
    "/signup",
    "/forgot-password",
    "/api",
    "/success",
    "/webhook",
];

fn is_public_path(path: &str) -> bool {
    PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Per-request session/subscription gate.
///
/// Unauthenticated traffic may only reach `/`; authenticated traffic must
/// have an active subscription confirmed by the billing provider before any
/// protected page is served. A failed provider lookup counts as unsubscribed.
pub async fn subscription_gate(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if is_public_path(&path) {
        return next.run(req).await;
    }

    let Some(claims) = session_from_headers(req.headers(), &state) else {
        if path == "/" {
            return next.run(req).await;
        }
        return Redirect::to("/").into_response();
    };

    match state.billing.get_customer_state(&claims.id).await {
        Ok(customer_state) if customer_state.has_active_subscription() => next.run(req).await,
        Ok(_) => {
            info!(user_id = %claims.id, %path, "no active subscription, redirecting to checkout");
            Redirect::to(&state.config.checkout_path()).into_response()
        }
        Err(err) => {
            // Fail closed: an unknown customer or a provider outage both land
            // on the checkout page, never on protected content.
            warn!(?err, user_id = %claims.id, "subscription lookup failed");
            Redirect::to(&state.config.checkout_path()).into_response()
        }
    }
}
