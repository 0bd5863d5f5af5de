#![allow(dead_code)]
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::billing_repository::{
    reconcile_order_paid, BillingRepository, NewSubscription, ReconcileOutcome, ReconcileStore,
    SubscriptionPatch, UserRef,
};
use crate::db::user_repository::UserRepository;
use crate::models::order_event::OrderPaidEvent;
use crate::models::signup::SignupPayload;
use crate::models::subscription::Subscription;
use crate::models::user::{OauthProvider, PublicUser, User};

fn mock_failure() -> sqlx::Error {
    sqlx::Error::Protocol("Mock DB failure".into())
}

/// Test double for [`UserRepository`].
pub struct MockDb {
    pub find_user_result: Option<User>,
    pub create_user_result: Option<User>,
    pub should_fail: bool,
    pub created_users: Mutex<Vec<SignupPayload>>,
}

impl Default for MockDb {
    fn default() -> Self {
        Self {
            find_user_result: None,
            create_user_result: None,
            should_fail: false,
            created_users: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_user_by_email(&self, _: &str) -> Result<Option<User>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self.find_user_result.clone())
    }

    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .find_user_result
            .as_ref()
            .filter(|user| user.id == user_id)
            .map(|user| PublicUser {
                id: user.id,
                email: user.email.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                role: user.role,
                customer_id: user.customer_id.clone(),
            }))
    }

    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .find_user_result
            .as_ref()
            .is_some_and(|user| user.email.eq_ignore_ascii_case(email)))
    }

    async fn create_user(
        &self,
        payload: &SignupPayload,
        _password_hash: &str,
        _provider: OauthProvider,
    ) -> Result<Uuid, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        self.created_users.lock().unwrap().push(payload.clone());
        Ok(Uuid::new_v4())
    }

    async fn create_user_with_oauth(
        &self,
        _: &str,
        _: &str,
        _: &str,
        _: OauthProvider,
    ) -> Result<User, sqlx::Error> {
        match &self.create_user_result {
            Some(user) => Ok(user.clone()),
            None => Err(sqlx::Error::RowNotFound),
        }
    }
}

/// Minimal user row for the in-memory billing tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemUser {
    pub id: Uuid,
    pub email: String,
    pub customer_id: Option<String>,
}

/// In-memory [`BillingRepository`] running the real reconcile function against
/// a snapshot of the tables; the snapshot is published only when the whole
/// event succeeds, which mirrors transactional rollback closely enough to
/// assert atomicity in tests.
#[derive(Default)]
pub struct MemBillingRepository {
    pub users: Mutex<Vec<MemUser>>,
    pub subscriptions: Mutex<Vec<Subscription>>,
    pub fail_subscription_writes: bool,
    pub fail_customer_id_updates: bool,
}

impl MemBillingRepository {
    pub fn with_user(self, user: MemUser) -> Self {
        self.users.lock().unwrap().push(user);
        self
    }
}

struct SnapshotStore {
    users: Vec<MemUser>,
    subscriptions: Vec<Subscription>,
    fail_subscription_writes: bool,
    fail_customer_id_updates: bool,
}

#[async_trait]
impl ReconcileStore for SnapshotStore {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRef>, sqlx::Error> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| UserRef {
                id: u.id,
                customer_id: u.customer_id.clone(),
            }))
    }

    async fn find_user_by_id(&mut self, user_id: Uuid) -> Result<Option<UserRef>, sqlx::Error> {
        Ok(self.users.iter().find(|u| u.id == user_id).map(|u| UserRef {
            id: u.id,
            customer_id: u.customer_id.clone(),
        }))
    }

    async fn subscription_exists(&mut self, subscription_id: &str) -> Result<bool, sqlx::Error> {
        Ok(self.subscriptions.iter().any(|s| s.id == subscription_id))
    }

    async fn insert_subscription(&mut self, row: &NewSubscription) -> Result<(), sqlx::Error> {
        if self.fail_subscription_writes {
            return Err(mock_failure());
        }
        if self.subscriptions.iter().any(|s| s.id == row.id) {
            // unique-violation stand-in
            return Err(sqlx::Error::Protocol("duplicate subscription id".into()));
        }
        self.subscriptions.push(Subscription {
            id: row.id.clone(),
            user_id: row.user_id,
            status: row.status.clone(),
            product_id: row.product_id.clone(),
            amount: row.amount,
            currency: row.currency.clone(),
            interval: row.interval.clone(),
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
        Ok(())
    }

    async fn update_subscription(&mut self, patch: &SubscriptionPatch) -> Result<(), sqlx::Error> {
        if self.fail_subscription_writes {
            return Err(mock_failure());
        }
        let row = self
            .subscriptions
            .iter_mut()
            .find(|s| s.id == patch.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        row.status = patch.status.clone();
        row.current_period_end = patch.current_period_end;
        row.cancel_at_period_end = patch.cancel_at_period_end;
        row.updated_at = patch.updated_at;
        Ok(())
    }

    async fn set_user_customer_id(
        &mut self,
        user_id: Uuid,
        customer_id: &str,
        _updated_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        if self.fail_customer_id_updates {
            return Err(mock_failure());
        }
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        user.customer_id = Some(customer_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl BillingRepository for MemBillingRepository {
    async fn reconcile_order_paid(
        &self,
        event: &OrderPaidEvent,
    ) -> Result<ReconcileOutcome, sqlx::Error> {
        let mut store = SnapshotStore {
            users: self.users.lock().unwrap().clone(),
            subscriptions: self.subscriptions.lock().unwrap().clone(),
            fail_subscription_writes: self.fail_subscription_writes,
            fail_customer_id_updates: self.fail_customer_id_updates,
        };

        let outcome =
            reconcile_order_paid(&mut store, event, OffsetDateTime::now_utc()).await?;

        // "Commit": publish the mutated snapshot. On Err the snapshot is
        // dropped and the shared tables stay untouched.
        *self.users.lock().unwrap() = store.users;
        *self.subscriptions.lock().unwrap() = store.subscriptions;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order_event::{OrderCustomer, OrderSubscription};

    fn order_event(user_email: &str) -> OrderPaidEvent {
        OrderPaidEvent {
            customer: OrderCustomer {
                id: "cus_1".into(),
                email: user_email.into(),
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

    fn repo_with_user(user_id: Uuid) -> MemBillingRepository {
        MemBillingRepository::default().with_user(MemUser {
            id: user_id,
            email: "a@x.com".into(),
            customer_id: None,
        })
    }

    #[tokio::test]
    async fn delivering_the_same_event_twice_keeps_one_row() {
        let user_id = Uuid::new_v4();
        let repo = repo_with_user(user_id);
        let event = order_event("a@x.com");

        let first = repo.reconcile_order_paid(&event).await.unwrap();
        let second = repo.reconcile_order_paid(&event).await.unwrap();

        assert!(matches!(first, ReconcileOutcome::Inserted { .. }));
        assert!(matches!(second, ReconcileOutcome::Updated { .. }));

        let subs = repo.subscriptions.lock().unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, "sub_1");
        assert_eq!(subs[0].user_id, user_id);

        let users = repo.users.lock().unwrap();
        assert_eq!(users[0].customer_id.as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn redelivery_with_cancellation_updates_in_place() {
        let user_id = Uuid::new_v4();
        let repo = repo_with_user(user_id);

        repo.reconcile_order_paid(&order_event("a@x.com"))
            .await
            .unwrap();

        let mut canceled = order_event("a@x.com");
        if let Some(sub) = canceled.subscription.as_mut() {
            sub.status = Some("canceled".into());
            sub.cancel_at_period_end = Some(true);
        }
        repo.reconcile_order_paid(&canceled).await.unwrap();

        let subs = repo.subscriptions.lock().unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, "canceled");
        assert!(subs[0].cancel_at_period_end);
        // identity fields survive redelivery untouched
        assert_eq!(subs[0].product_id, "p1");
        assert_eq!(subs[0].amount, 1000);
    }

    #[tokio::test]
    async fn failed_customer_update_rolls_back_the_subscription_insert() {
        let user_id = Uuid::new_v4();
        let repo = MemBillingRepository {
            fail_customer_id_updates: true,
            ..MemBillingRepository::default()
        }
        .with_user(MemUser {
            id: user_id,
            email: "a@x.com".into(),
            customer_id: None,
        });

        let err = repo
            .reconcile_order_paid(&order_event("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, sqlx::Error::Protocol(_)));

        // no partial state: subscription not committed, customer id unchanged
        assert!(repo.subscriptions.lock().unwrap().is_empty());
        assert_eq!(repo.users.lock().unwrap()[0].customer_id, None);
    }

    #[tokio::test]
    async fn unknown_customer_leaves_tables_untouched() {
        let repo = MemBillingRepository::default();
        let outcome = repo
            .reconcile_order_paid(&order_event("nobody@x.com"))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::UserNotFound);
        assert!(repo.subscriptions.lock().unwrap().is_empty());
        assert!(repo.users.lock().unwrap().is_empty());
    }
}
