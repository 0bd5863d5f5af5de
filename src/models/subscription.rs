use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A reconciled subscription row. `id` is assigned by the payment provider and
/// is the natural key every upsert is keyed on.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: Uuid,
    pub status: String,
    pub product_id: String,
    pub amount: i64,
    pub currency: String,
    pub interval: String,
    pub current_period_end: OffsetDateTime,
    pub cancel_at_period_end: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
