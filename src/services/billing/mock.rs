#![allow(dead_code)]
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand_core::RngCore;

use super::{
    BillingEvent, BillingProvider, BillingServiceError, CheckoutSession, CreateCheckoutRequest,
    CustomerState, CustomerSubscription, WebhookSignatureHeaders,
};

#[derive(Clone, Default)]
pub struct MockPolarService {
    pub customer_state: Arc<Mutex<Option<CustomerState>>>,
    pub fail_customer_state: Arc<Mutex<bool>>,
    pub created_sessions: Arc<Mutex<Vec<CheckoutSession>>>,
    pub last_create_requests: Arc<Mutex<Vec<CreateCheckoutRequest>>>,
    pub events: Arc<Mutex<Vec<BillingEvent>>>,
}

fn make_id(prefix: &str) -> String {
    let mut bytes = [0u8; 8];
    rand_core::OsRng.fill_bytes(&mut bytes);
    format!("{}_{}", prefix, hex::encode(bytes))
}

impl MockPolarService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active_subscription(self) -> Self {
        *self.customer_state.lock().unwrap() = Some(CustomerState {
            active_subscriptions: vec![CustomerSubscription {
                id: make_id("sub_test"),
                status: "active".into(),
                current_period_end: None,
                cancel_at_period_end: false,
            }],
        });
        self
    }

    pub fn with_lookup_failure(self) -> Self {
        *self.fail_customer_state.lock().unwrap() = true;
        self
    }
}

#[async_trait]
impl BillingProvider for MockPolarService {
    async fn get_customer_state(
        &self,
        external_id: &str,
    ) -> Result<CustomerState, BillingServiceError> {
        if *self.fail_customer_state.lock().unwrap() {
            return Err(BillingServiceError::Api("mock lookup failure".into()));
        }
        match self.customer_state.lock().unwrap().clone() {
            Some(state) => Ok(state),
            None => Err(BillingServiceError::NotFound(format!(
                "no customer with external id {}",
                external_id
            ))),
        }
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingServiceError> {
        // capture the request
        self.last_create_requests.lock().unwrap().push(req.clone());

        let session = CheckoutSession {
            id: make_id("co_test"),
            url: Some("https://example.test/checkout".into()),
        };
        self.created_sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        headers: &WebhookSignatureHeaders<'_>,
    ) -> Result<BillingEvent, BillingServiceError> {
        let val: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| BillingServiceError::Serde(e.to_string()))?;
        let ty = val
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        let evt = BillingEvent {
            id: headers
                .id
                .map(|s| s.to_string())
                .unwrap_or_else(|| make_id("wh")),
            r#type: ty,
            payload: val,
        };
        self.events.lock().unwrap().push(evt.clone());
        Ok(evt)
    }
}
