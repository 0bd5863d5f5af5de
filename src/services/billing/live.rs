#![allow(dead_code)]
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use super::{
    BillingEvent, BillingProvider, BillingServiceError, CheckoutSession, CreateCheckoutRequest,
    CustomerState, WebhookSignatureHeaders,
};

type HmacSha256 = Hmac<Sha256>;

/// Deliveries older (or newer) than this are rejected outright.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

pub struct LivePolarService {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    webhook_secret: String,
}

impl LivePolarService {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build billing http client");
        Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
            webhook_secret: webhook_secret.into(),
        }
    }

    pub fn from_settings(settings: &crate::config::PolarSettings) -> Self {
        Self::new(
            settings.server.api_base(),
            settings.access_token.clone(),
            settings.webhook_secret.clone(),
        )
    }

    /// The provider hands the secret out base64-encoded behind a `whsec_`
    /// prefix; older dashboards showed the raw string.
    fn signing_key(&self) -> Vec<u8> {
        let trimmed = self
            .webhook_secret
            .strip_prefix("whsec_")
            .unwrap_or(&self.webhook_secret);
        BASE64_STANDARD
            .decode(trimmed)
            .unwrap_or_else(|_| trimmed.as_bytes().to_vec())
    }
}

#[async_trait]
impl BillingProvider for LivePolarService {
    async fn get_customer_state(
        &self,
        external_id: &str,
    ) -> Result<CustomerState, BillingServiceError> {
        let url = format!(
            "{}/v1/customers/external/{}/state",
            self.base_url, external_id
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| BillingServiceError::Api(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BillingServiceError::NotFound(format!(
                "no customer with external id {}",
                external_id
            )));
        }
        if !resp.status().is_success() {
            return Err(BillingServiceError::Api(format!(
                "customer state request failed with status {}",
                resp.status()
            )));
        }

        resp.json::<CustomerState>()
            .await
            .map_err(|e| BillingServiceError::Serde(e.to_string()))
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingServiceError> {
        let url = format!("{}/v1/checkouts", self.base_url);
        let mut body = serde_json::json!({
            "products": [req.product_id],
            "success_url": req.success_url,
        });
        if let Some(external_id) = &req.external_customer_id {
            body["external_customer_id"] = serde_json::Value::String(external_id.clone());
        }
        if let Some(email) = &req.customer_email {
            body["customer_email"] = serde_json::Value::String(email.clone());
        }

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BillingServiceError::Api(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BillingServiceError::Api(format!(
                "checkout creation failed with status {}",
                resp.status()
            )));
        }

        resp.json::<CheckoutSession>()
            .await
            .map_err(|e| BillingServiceError::Serde(e.to_string()))
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        headers: &WebhookSignatureHeaders<'_>,
    ) -> Result<BillingEvent, BillingServiceError> {
        let (Some(id), Some(timestamp), Some(signature)) =
            (headers.id, headers.timestamp, headers.signature)
        else {
            return Err(BillingServiceError::Webhook(
                "missing webhook signature headers".into(),
            ));
        };

        let ts = timestamp
            .parse::<i64>()
            .map_err(|_| BillingServiceError::Webhook("invalid webhook timestamp".into()))?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        if (now - ts).abs() > TIMESTAMP_TOLERANCE_SECS {
            return Err(BillingServiceError::Webhook(
                "webhook timestamp outside tolerance".into(),
            ));
        }

        let mut mac = HmacSha256::new_from_slice(&self.signing_key())
            .map_err(|e| BillingServiceError::Config(e.to_string()))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        // Header carries space-separated "v1,<base64>" entries.
        let matched = signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .any(|(_, sig)| sig.as_bytes().ct_eq(expected.as_bytes()).into());
        if !matched {
            return Err(BillingServiceError::Webhook("signature mismatch".into()));
        }

        let val: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| BillingServiceError::Serde(e.to_string()))?;
        let ty = val
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(BillingEvent {
            id: id.to_string(),
            r#type: ty,
            payload: val,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn sign(secret: &str, id: &str, timestamp: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}.", id, timestamp).as_bytes());
        mac.update(payload);
        format!("v1,{}", BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn service(base_url: &str) -> LivePolarService {
        LivePolarService::new(base_url, "polar_oat_test", "testsecret")
    }

    #[test]
    fn verify_webhook_accepts_a_valid_signature() {
        let svc = service("http://unused");
        let payload = br#"{"type": "order.paid", "data": {}}"#;
        let ts = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let sig = sign("testsecret", "wh_1", &ts, payload);

        let evt = svc
            .verify_webhook(
                payload,
                &WebhookSignatureHeaders {
                    id: Some("wh_1"),
                    timestamp: Some(&ts),
                    signature: Some(&sig),
                },
            )
            .unwrap();
        assert_eq!(evt.id, "wh_1");
        assert_eq!(evt.r#type, "order.paid");
    }

    #[test]
    fn verify_webhook_rejects_a_tampered_body() {
        let svc = service("http://unused");
        let ts = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let sig = sign("testsecret", "wh_1", &ts, br#"{"type": "order.paid"}"#);

        let result = svc.verify_webhook(
            br#"{"type": "order.refunded"}"#,
            &WebhookSignatureHeaders {
                id: Some("wh_1"),
                timestamp: Some(&ts),
                signature: Some(&sig),
            },
        );
        assert!(matches!(result, Err(BillingServiceError::Webhook(_))));
    }

    #[test]
    fn verify_webhook_rejects_missing_headers() {
        let svc = service("http://unused");
        let result = svc.verify_webhook(b"{}", &WebhookSignatureHeaders::default());
        assert!(matches!(result, Err(BillingServiceError::Webhook(_))));
    }

    #[test]
    fn verify_webhook_rejects_stale_timestamps() {
        let svc = service("http://unused");
        let payload = br#"{"type": "order.paid"}"#;
        let ts = (OffsetDateTime::now_utc().unix_timestamp() - 3600).to_string();
        let sig = sign("testsecret", "wh_1", &ts, payload);

        let result = svc.verify_webhook(
            payload,
            &WebhookSignatureHeaders {
                id: Some("wh_1"),
                timestamp: Some(&ts),
                signature: Some(&sig),
            },
        );
        assert!(matches!(result, Err(BillingServiceError::Webhook(_))));
    }

    #[tokio::test]
    async fn get_customer_state_parses_active_subscriptions() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/customers/external/u1/state")
                .header("authorization", "Bearer polar_oat_test");
            then.status(200).json_body(serde_json::json!({
                "active_subscriptions": [
                    { "id": "sub_1", "status": "active" }
                ]
            }));
        });

        let svc = service(&server.base_url());
        let state = svc.get_customer_state("u1").await.unwrap();
        mock.assert();
        assert!(state.has_active_subscription());
    }

    #[tokio::test]
    async fn get_customer_state_maps_unknown_customer_to_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/customers/external/missing/state");
            then.status(404);
        });

        let svc = service(&server.base_url());
        let result = svc.get_customer_state("missing").await;
        assert!(matches!(result, Err(BillingServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_checkout_session_posts_product_and_success_url() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/checkouts")
                .json_body_partial(r#"{ "products": ["p1"], "external_customer_id": "u1" }"#);
            then.status(201).json_body(serde_json::json!({
                "id": "co_123",
                "url": "https://sandbox.polar.sh/checkout/co_123"
            }));
        });

        let svc = service(&server.base_url());
        let session = svc
            .create_checkout_session(CreateCheckoutRequest {
                product_id: "p1".into(),
                success_url: "/success?checkout_id={CHECKOUT_ID}".into(),
                external_customer_id: Some("u1".into()),
                customer_email: None,
            })
            .await
            .unwrap();
        mock.assert();
        assert_eq!(session.id, "co_123");
        assert_eq!(
            session.url.as_deref(),
            Some("https://sandbox.polar.sh/checkout/co_123")
        );
    }
}
