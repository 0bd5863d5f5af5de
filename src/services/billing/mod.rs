#![allow(dead_code)]
// NOTE: the provider is wrapped at its HTTP contract only (customer state,
// checkout creation, webhook verification). Anything beyond those three calls
// belongs upstream, not here.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum BillingServiceError {
    #[error("billing api error: {0}")]
    Api(String),
    #[error("webhook verification failed: {0}")]
    Webhook(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("other error: {0}")]
    Other(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerSubscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<String>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

/// The provider's per-customer state, keyed by the external id we hand over at
/// checkout (our user id).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CustomerState {
    #[serde(default)]
    pub active_subscriptions: Vec<CustomerSubscription>,
}

impl CustomerState {
    pub fn has_active_subscription(&self) -> bool {
        self.active_subscriptions
            .first()
            .is_some_and(|sub| sub.status == "active")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    pub product_id: String,
    pub success_url: String,
    pub external_customer_id: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// A verified webhook delivery: event id (from the delivery headers), event
/// type, and the raw payload for downstream normalization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    pub r#type: String,
    pub payload: serde_json::Value,
}

/// Signature material carried on the webhook delivery headers
/// (standard-webhooks scheme).
#[derive(Clone, Copy, Debug, Default)]
pub struct WebhookSignatureHeaders<'a> {
    pub id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Fetches subscription state for a customer addressed by external id.
    async fn get_customer_state(
        &self,
        external_id: &str,
    ) -> Result<CustomerState, BillingServiceError>;

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingServiceError>;

    fn verify_webhook(
        &self,
        payload: &[u8],
        headers: &WebhookSignatureHeaders<'_>,
    ) -> Result<BillingEvent, BillingServiceError>;
}

mod live;
mod mock;

#[allow(unused_imports)]
pub use live::LivePolarService;
#[allow(unused_imports)]
pub use mock::MockPolarService;
