use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Event name the reconciler acts on. Every other webhook type is acknowledged
/// and dropped.
pub const ORDER_PAID: &str = "order.paid";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for field: {0}")]
    InvalidField(&'static str),
}

/// Customer identity as reported by the payment provider. `external_id` is the
/// id our side handed to the provider at checkout time (the user id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCustomer {
    pub id: String,
    pub email: String,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSubscription {
    pub id: String,
    pub status: Option<String>,
    pub recurring_interval: Option<String>,
    pub current_period_end: Option<OffsetDateTime>,
    pub cancel_at_period_end: Option<bool>,
}

/// Normalized `order.paid` event. This is the only shape the reconciliation
/// core ever sees; transport and provider quirks stop here.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub customer: OrderCustomer,
    pub subscription: Option<OrderSubscription>,
    pub product_id: String,
    pub amount: i64,
    pub currency: String,
}

// Small helper: nested json lookup
fn jget<'a>(val: &'a serde_json::Value, path: &[&str]) -> Option<&'a serde_json::Value> {
    let mut cur = val;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

fn require_str(
    val: &serde_json::Value,
    path: &[&str],
    name: &'static str,
) -> Result<String, PayloadError> {
    jget(val, path)
        .ok_or(PayloadError::MissingField(name))?
        .as_str()
        .map(|s| s.to_string())
        .ok_or(PayloadError::InvalidField(name))
}

fn require_i64(
    val: &serde_json::Value,
    path: &[&str],
    name: &'static str,
) -> Result<i64, PayloadError> {
    jget(val, path)
        .ok_or(PayloadError::MissingField(name))?
        .as_i64()
        .ok_or(PayloadError::InvalidField(name))
}

fn optional_str(val: &serde_json::Value, path: &[&str]) -> Option<String> {
    jget(val, path)?.as_str().map(|s| s.to_string())
}

/// The provider sends the period end either as unix seconds or as an RFC 3339
/// string; absence is fine (the reconciler supplies a default).
fn optional_timestamp(
    val: &serde_json::Value,
    path: &[&str],
    name: &'static str,
) -> Result<Option<OffsetDateTime>, PayloadError> {
    let Some(raw) = jget(val, path) else {
        return Ok(None);
    };
    if raw.is_null() {
        return Ok(None);
    }
    if let Some(secs) = raw.as_i64() {
        return OffsetDateTime::from_unix_timestamp(secs)
            .map(Some)
            .map_err(|_| PayloadError::InvalidField(name));
    }
    if let Some(s) = raw.as_str() {
        return OffsetDateTime::parse(s, &Rfc3339)
            .map(Some)
            .map_err(|_| PayloadError::InvalidField(name));
    }
    Err(PayloadError::InvalidField(name))
}

impl OrderPaidEvent {
    /// Validates and normalizes an untrusted `order.paid` payload body
    /// (the object under `data`).
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, PayloadError> {
        let customer = OrderCustomer {
            id: require_str(payload, &["data", "customer", "id"], "data.customer.id")?,
            email: require_str(
                payload,
                &["data", "customer", "email"],
                "data.customer.email",
            )?,
            external_id: optional_str(payload, &["data", "customer", "external_id"]),
        };

        let subscription = match jget(payload, &["data", "subscription"]) {
            Some(sub) if !sub.is_null() => Some(OrderSubscription {
                id: require_str(payload, &["data", "subscription", "id"], "data.subscription.id")?,
                status: sub.get("status").and_then(|v| v.as_str()).map(String::from),
                recurring_interval: sub
                    .get("recurring_interval")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                current_period_end: optional_timestamp(
                    payload,
                    &["data", "subscription", "current_period_end"],
                    "data.subscription.current_period_end",
                )?,
                cancel_at_period_end: sub.get("cancel_at_period_end").and_then(|v| v.as_bool()),
            }),
            _ => None,
        };

        Ok(OrderPaidEvent {
            customer,
            subscription,
            product_id: require_str(payload, &["data", "product_id"], "data.product_id")?,
            amount: require_i64(payload, &["data", "amount"], "data.amount")?,
            currency: require_str(payload, &["data", "currency"], "data.currency")?,
        })
    }
}
