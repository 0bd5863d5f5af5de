use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::models::order_event::OrderPaidEvent;

/// Defaults applied when the provider omits a field from the order payload.
pub const DEFAULT_SUBSCRIPTION_STATUS: &str = "active";
pub const DEFAULT_RECURRING_INTERVAL: &str = "month";
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// The user fields the reconciler needs to resolve identity and decide whether
/// the customer-id backlink must be refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: Uuid,
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
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

/// Mutable-field update for an existing subscription row. Identity fields
/// (user, product, amount, currency, interval) are never rewritten on
/// redelivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPatch {
    pub id: String,
    pub status: String,
    pub current_period_end: OffsetDateTime,
    pub cancel_at_period_end: bool,
    pub updated_at: OffsetDateTime,
}

/// Transactional data-access capability the reconciler runs against. Every
/// method executes inside the one transaction the owning repository opened;
/// an `Err` from any of them aborts the whole reconciliation.
#[async_trait]
pub trait ReconcileStore: Send {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRef>, sqlx::Error>;
    async fn find_user_by_id(&mut self, user_id: Uuid) -> Result<Option<UserRef>, sqlx::Error>;
    async fn subscription_exists(&mut self, subscription_id: &str) -> Result<bool, sqlx::Error>;
    async fn insert_subscription(&mut self, row: &NewSubscription) -> Result<(), sqlx::Error>;
    async fn update_subscription(&mut self, patch: &SubscriptionPatch) -> Result<(), sqlx::Error>;
    async fn set_user_customer_id(
        &mut self,
        user_id: Uuid,
        customer_id: &str,
        updated_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Neither the customer email nor the external id matched a user. The
    /// caller acknowledges the event anyway; provider retries cannot fix an
    /// identity mismatch.
    UserNotFound,
    /// A new subscription row was inserted for the resolved user.
    Inserted { subscription_id: String, user_id: Uuid },
    /// The subscription id was already known; mutable fields were refreshed.
    Updated { subscription_id: String, user_id: Uuid },
    /// The order carried no subscription; only the customer backlink applied.
    CustomerLinked { user_id: Uuid },
}

/// Reconciles one `order.paid` event against the local store. This is the
/// single source of truth for identity resolution, upsert semantics, and
/// payload defaults; transports and storage backends stay out of it.
///
/// Idempotent under redelivery: the upsert is keyed strictly on the provider
/// subscription id, and a second delivery of the same payload only rewrites
/// mutable fields.
pub async fn reconcile_order_paid<S: ReconcileStore + ?Sized>(
    store: &mut S,
    event: &OrderPaidEvent,
    now: OffsetDateTime,
) -> Result<ReconcileOutcome, sqlx::Error> {
    // Identity resolution: email first, then the external id the provider
    // echoes back from checkout.
    let mut user = store.find_user_by_email(&event.customer.email).await?;
    if user.is_none() {
        if let Some(external_id) = event
            .customer
            .external_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
        {
            user = store.find_user_by_id(external_id).await?;
        }
    }

    let Some(user) = user else {
        return Ok(ReconcileOutcome::UserNotFound);
    };

    let outcome = match &event.subscription {
        Some(sub) => {
            let status = sub
                .status
                .clone()
                .unwrap_or_else(|| DEFAULT_SUBSCRIPTION_STATUS.to_string());
            let current_period_end = sub
                .current_period_end
                .unwrap_or_else(|| now + Duration::days(DEFAULT_PERIOD_DAYS));
            let cancel_at_period_end = sub.cancel_at_period_end.unwrap_or(false);

            if store.subscription_exists(&sub.id).await? {
                store
                    .update_subscription(&SubscriptionPatch {
                        id: sub.id.clone(),
                        status,
                        current_period_end,
                        cancel_at_period_end,
                        updated_at: now,
                    })
                    .await?;
                ReconcileOutcome::Updated {
                    subscription_id: sub.id.clone(),
                    user_id: user.id,
                }
            } else {
                store
                    .insert_subscription(&NewSubscription {
                        id: sub.id.clone(),
                        user_id: user.id,
                        status,
                        product_id: event.product_id.clone(),
                        amount: event.amount,
                        currency: event.currency.clone(),
                        interval: sub
                            .recurring_interval
                            .clone()
                            .unwrap_or_else(|| DEFAULT_RECURRING_INTERVAL.to_string()),
                        current_period_end,
                        cancel_at_period_end,
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
                ReconcileOutcome::Inserted {
                    subscription_id: sub.id.clone(),
                    user_id: user.id,
                }
            }
        }
        None => ReconcileOutcome::CustomerLinked { user_id: user.id },
    };

    if user.customer_id.as_deref() != Some(event.customer.id.as_str()) {
        store
            .set_user_customer_id(user.id, &event.customer.id, now)
            .await?;
    }

    Ok(outcome)
}

/// Storage-facing entry point for the webhook route. Implementations wrap
/// [`reconcile_order_paid`] in whatever their notion of a transaction is and
/// roll the whole event back on any error.
#[async_trait]
pub trait BillingRepository: Send + Sync {
    async fn reconcile_order_paid(
        &self,
        event: &OrderPaidEvent,
    ) -> Result<ReconcileOutcome, sqlx::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order_event::{OrderCustomer, OrderSubscription};

    /// Bare-bones in-memory store for exercising the pure function. The
    /// snapshot-committing variant lives in `db::mock_db`.
    #[derive(Default)]
    struct VecStore {
        users: Vec<UserRef>,
        users_by_email: Vec<(String, Uuid)>,
        subscriptions: Vec<NewSubscription>,
        patches: Vec<SubscriptionPatch>,
        customer_updates: Vec<(Uuid, String)>,
    }

    #[async_trait]
    impl ReconcileStore for VecStore {
        async fn find_user_by_email(
            &mut self,
            email: &str,
        ) -> Result<Option<UserRef>, sqlx::Error> {
            let id = self
                .users_by_email
                .iter()
                .find(|(e, _)| e == email)
                .map(|(_, id)| *id);
            Ok(id.and_then(|id| self.users.iter().find(|u| u.id == id).cloned()))
        }

        async fn find_user_by_id(
            &mut self,
            user_id: Uuid,
        ) -> Result<Option<UserRef>, sqlx::Error> {
            Ok(self.users.iter().find(|u| u.id == user_id).cloned())
        }

        async fn subscription_exists(
            &mut self,
            subscription_id: &str,
        ) -> Result<bool, sqlx::Error> {
            Ok(self.subscriptions.iter().any(|s| s.id == subscription_id))
        }

        async fn insert_subscription(
            &mut self,
            row: &NewSubscription,
        ) -> Result<(), sqlx::Error> {
            self.subscriptions.push(row.clone());
            Ok(())
        }

        async fn update_subscription(
            &mut self,
            patch: &SubscriptionPatch,
        ) -> Result<(), sqlx::Error> {
            self.patches.push(patch.clone());
            Ok(())
        }

        async fn set_user_customer_id(
            &mut self,
            user_id: Uuid,
            customer_id: &str,
            _updated_at: OffsetDateTime,
        ) -> Result<(), sqlx::Error> {
            self.customer_updates
                .push((user_id, customer_id.to_string()));
            Ok(())
        }
    }

    fn event_with_subscription() -> OrderPaidEvent {
        OrderPaidEvent {
            customer: OrderCustomer {
                id: "cus_1".into(),
                email: "a@x.com".into(),
                external_id: None,
            },
            subscription: Some(OrderSubscription {
                id: "sub_1".into(),
                status: Some("active".into()),
                recurring_interval: Some("month".into()),
                current_period_end: OffsetDateTime::from_unix_timestamp(1893456000).ok(),
                cancel_at_period_end: None,
            }),
            product_id: "p1".into(),
            amount: 1000,
            currency: "usd".into(),
        }
    }

    fn seeded_store(user_id: Uuid) -> VecStore {
        let mut store = VecStore::default();
        store.users.push(UserRef {
            id: user_id,
            customer_id: None,
        });
        store.users_by_email.push(("a@x.com".into(), user_id));
        store
    }

    #[tokio::test]
    async fn inserts_subscription_and_links_customer() {
        let user_id = Uuid::new_v4();
        let mut store = seeded_store(user_id);
        let now = OffsetDateTime::now_utc();

        let outcome = reconcile_order_paid(&mut store, &event_with_subscription(), now)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Inserted {
                subscription_id: "sub_1".into(),
                user_id,
            }
        );
        assert_eq!(store.subscriptions.len(), 1);
        let row = &store.subscriptions[0];
        assert_eq!(row.user_id, user_id);
        assert_eq!(row.status, "active");
        assert_eq!(row.interval, "month");
        assert_eq!(row.current_period_end.unix_timestamp(), 1893456000);
        assert!(!row.cancel_at_period_end);
        assert_eq!(store.customer_updates, vec![(user_id, "cus_1".to_string())]);
    }

    #[tokio::test]
    async fn redelivery_updates_mutable_fields_only() {
        let user_id = Uuid::new_v4();
        let mut store = seeded_store(user_id);
        let now = OffsetDateTime::now_utc();

        reconcile_order_paid(&mut store, &event_with_subscription(), now)
            .await
            .unwrap();

        let mut redelivered = event_with_subscription();
        if let Some(sub) = redelivered.subscription.as_mut() {
            sub.status = Some("canceled".into());
            sub.cancel_at_period_end = Some(true);
        }
        let outcome = reconcile_order_paid(&mut store, &redelivered, now)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Updated {
                subscription_id: "sub_1".into(),
                user_id,
            }
        );
        // still exactly one inserted row; the second pass went through update
        assert_eq!(store.subscriptions.len(), 1);
        assert_eq!(store.patches.len(), 1);
        assert_eq!(store.patches[0].status, "canceled");
        assert!(store.patches[0].cancel_at_period_end);
    }

    #[tokio::test]
    async fn defaults_apply_when_payload_omits_fields() {
        let user_id = Uuid::new_v4();
        let mut store = seeded_store(user_id);
        let now = OffsetDateTime::now_utc();

        let mut event = event_with_subscription();
        if let Some(sub) = event.subscription.as_mut() {
            sub.status = None;
            sub.recurring_interval = None;
            sub.current_period_end = None;
            sub.cancel_at_period_end = None;
        }

        reconcile_order_paid(&mut store, &event, now).await.unwrap();

        let row = &store.subscriptions[0];
        assert_eq!(row.status, DEFAULT_SUBSCRIPTION_STATUS);
        assert_eq!(row.interval, DEFAULT_RECURRING_INTERVAL);
        assert_eq!(
            row.current_period_end,
            now + Duration::days(DEFAULT_PERIOD_DAYS)
        );
        assert!(!row.cancel_at_period_end);
    }

    #[tokio::test]
    async fn falls_back_to_external_id_lookup() {
        let user_id = Uuid::new_v4();
        let mut store = VecStore::default();
        // user exists but under a different email than the order's
        store.users.push(UserRef {
            id: user_id,
            customer_id: None,
        });

        let mut event = event_with_subscription();
        event.customer.email = "other@x.com".into();
        event.customer.external_id = Some(user_id.to_string());

        let outcome = reconcile_order_paid(&mut store, &event, OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Inserted { user_id: id, .. } if id == user_id));
    }

    #[tokio::test]
    async fn unresolved_identity_writes_nothing() {
        let mut store = VecStore::default();
        let outcome =
            reconcile_order_paid(&mut store, &event_with_subscription(), OffsetDateTime::now_utc())
                .await
                .unwrap();

        assert_eq!(outcome, ReconcileOutcome::UserNotFound);
        assert!(store.subscriptions.is_empty());
        assert!(store.patches.is_empty());
        assert!(store.customer_updates.is_empty());
    }

    #[tokio::test]
    async fn order_without_subscription_still_links_customer() {
        let user_id = Uuid::new_v4();
        let mut store = seeded_store(user_id);

        let mut event = event_with_subscription();
        event.subscription = None;

        let outcome = reconcile_order_paid(&mut store, &event, OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::CustomerLinked { user_id });
        assert!(store.subscriptions.is_empty());
        assert_eq!(store.customer_updates.len(), 1);
    }

    #[tokio::test]
    async fn matching_customer_id_is_not_rewritten() {
        let user_id = Uuid::new_v4();
        let mut store = VecStore::default();
        store.users.push(UserRef {
            id: user_id,
            customer_id: Some("cus_1".into()),
        });
        store.users_by_email.push(("a@x.com".into(), user_id));

        reconcile_order_paid(&mut store, &event_with_subscription(), OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert!(store.customer_updates.is_empty());
    }
}
