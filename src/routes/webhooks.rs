use axum::Json;
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use axum::{http::StatusCode, response::Response};
use serde_json::json;
use tracing::{error, info, warn};

use crate::db::billing_repository::ReconcileOutcome;
use crate::models::order_event::{OrderPaidEvent, ORDER_PAID};
use crate::services::billing::WebhookSignatureHeaders;
use crate::state::AppState;

fn signature_headers(headers: &HeaderMap) -> WebhookSignatureHeaders<'_> {
    WebhookSignatureHeaders {
        id: headers.get("webhook-id").and_then(|h| h.to_str().ok()),
        timestamp: headers
            .get("webhook-timestamp")
            .and_then(|h| h.to_str().ok()),
        signature: headers
            .get("webhook-signature")
            .and_then(|h| h.to_str().ok()),
    }
}

// POST /webhook/polar
pub async fn polar_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let evt = match app_state
        .billing
        .verify_webhook(&body, &signature_headers(&headers))
    {
        Ok(evt) => evt,
        Err(err) => {
            warn!(?err, "polar webhook verification failed");
            return (StatusCode::BAD_REQUEST, "invalid webhook").into_response();
        }
    };

    // At-least-once delivery: every unrecognized type is acknowledged so the
    // provider stops retrying it.
    if evt.r#type != ORDER_PAID {
        info!(evt_type = %evt.r#type, "unhandled polar event acknowledged");
        return Json(json!({ "message": "Event type not handled" })).into_response();
    }

    let event = match OrderPaidEvent::from_payload(&evt.payload) {
        Ok(event) => event,
        Err(err) => {
            error!(?err, event_id = %evt.id, "malformed order.paid payload");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Webhook processing error",
                    "details": err.to_string(),
                })),
            )
                .into_response();
        }
    };

    match app_state.billing_repo.reconcile_order_paid(&event).await {
        Ok(ReconcileOutcome::UserNotFound) => {
            // Acknowledged on purpose: redelivery cannot resolve an identity
            // mismatch, it would only pile up failures.
            warn!(
                customer_email = %event.customer.email,
                external_id = ?event.customer.external_id,
                "could not resolve user for paid order"
            );
            Json(json!({ "success": true })).into_response()
        }
        Ok(outcome) => {
            info!(?outcome, event_id = %evt.id, "reconciled paid order");
            Json(json!({ "success": true })).into_response()
        }
        Err(err) => {
            error!(?err, event_id = %evt.id, "failed to reconcile paid order");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Database error",
                    "details": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}
