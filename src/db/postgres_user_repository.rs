use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::db::user_repository::UserRepository;
use crate::models::{
    signup::SignupPayload,
    user::{OauthProvider, PublicUser, User},
};

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, \
                            oauth_provider, customer_id, created_at, updated_at";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<Postgres, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<Postgres, PublicUser>(
            "SELECT id, email, first_name, last_name, role, customer_id
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<Postgres, i64>(
            "SELECT 1 FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .is_some();

        Ok(exists)
    }

    async fn create_user(
        &self,
        payload: &SignupPayload,
        password_hash: &str,
        provider: OauthProvider,
    ) -> Result<Uuid, sqlx::Error> {
        sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, oauth_provider)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&payload.email)
        .bind(password_hash)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(provider)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_user_with_oauth(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        provider: OauthProvider,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, oauth_provider)
            VALUES ($1, '', $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<Postgres, User>(&query)
            .bind(email)
            .bind(first_name)
            .bind(last_name)
            .bind(provider)
            .fetch_one(&self.pool)
            .await
    }
}
