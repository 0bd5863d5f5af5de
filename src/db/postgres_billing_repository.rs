use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::billing_repository::{
    reconcile_order_paid, BillingRepository, NewSubscription, ReconcileOutcome, ReconcileStore,
    SubscriptionPatch, UserRef,
};
use crate::models::order_event::OrderPaidEvent;

pub struct PostgresBillingRepository {
    pub pool: PgPool,
}

/// [`ReconcileStore`] over one open Postgres transaction.
struct PgReconcileStore<'a, 'c> {
    tx: &'a mut Transaction<'c, Postgres>,
}

#[async_trait]
impl ReconcileStore for PgReconcileStore<'_, '_> {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRef>, sqlx::Error> {
        let conn: &mut PgConnection = &mut *self.tx;
        let row = sqlx::query_as::<Postgres, (Uuid, Option<String>)>(
            "SELECT id, customer_id FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(|(id, customer_id)| UserRef { id, customer_id }))
    }

    async fn find_user_by_id(&mut self, user_id: Uuid) -> Result<Option<UserRef>, sqlx::Error> {
        let conn: &mut PgConnection = &mut *self.tx;
        let row = sqlx::query_as::<Postgres, (Uuid, Option<String>)>(
            "SELECT id, customer_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(|(id, customer_id)| UserRef { id, customer_id }))
    }

    async fn subscription_exists(&mut self, subscription_id: &str) -> Result<bool, sqlx::Error> {
        let conn: &mut PgConnection = &mut *self.tx;
        let exists = sqlx::query_scalar::<Postgres, i64>(
            "SELECT 1 FROM subscriptions WHERE id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(conn)
        .await?
        .is_some();

        Ok(exists)
    }

    async fn insert_subscription(&mut self, row: &NewSubscription) -> Result<(), sqlx::Error> {
        let conn: &mut PgConnection = &mut *self.tx;
        // No ON CONFLICT guard: a concurrent duplicate delivery must fail the
        // transaction and take the update path on provider redelivery, rather
        // than silently dropping the event's field values.
        sqlx::query::<Postgres>(
            r#"
            INSERT INTO subscriptions (
                id, user_id, status, product_id, amount, currency, "interval",
                current_period_end, cancel_at_period_end, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&row.id)
        .bind(row.user_id)
        .bind(&row.status)
        .bind(&row.product_id)
        .bind(row.amount)
        .bind(&row.currency)
        .bind(&row.interval)
        .bind(row.current_period_end)
        .bind(row.cancel_at_period_end)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    async fn update_subscription(&mut self, patch: &SubscriptionPatch) -> Result<(), sqlx::Error> {
        let conn: &mut PgConnection = &mut *self.tx;
        sqlx::query::<Postgres>(
            r#"
            UPDATE subscriptions
            SET status = $1,
                current_period_end = $2,
                cancel_at_period_end = $3,
                updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(&patch.status)
        .bind(patch.current_period_end)
        .bind(patch.cancel_at_period_end)
        .bind(patch.updated_at)
        .bind(&patch.id)
        .execute(conn)
        .await?;

        Ok(())
    }

    async fn set_user_customer_id(
        &mut self,
        user_id: Uuid,
        customer_id: &str,
        updated_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        let conn: &mut PgConnection = &mut *self.tx;
        sqlx::query::<Postgres>(
            "UPDATE users SET customer_id = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(customer_id)
        .bind(updated_at)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BillingRepository for PostgresBillingRepository {
    async fn reconcile_order_paid(
        &self,
        event: &OrderPaidEvent,
    ) -> Result<ReconcileOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = {
            let mut store = PgReconcileStore { tx: &mut tx };
            reconcile_order_paid(&mut store, event, OffsetDateTime::now_utc()).await
        };

        match result {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}
