use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::Type, FromRow};

#[derive(sqlx::Type, Debug, Deserialize, Serialize, PartialEq, Eq, Copy, Clone)]
#[sqlx(type_name = "oauth_provider", rename_all = "lowercase")] // match the PostgreSQL type
#[serde(rename_all = "lowercase")]
pub enum OauthProvider {
    Google,
    Github,
    Apple,
    Email,
}

impl fmt::Display for OauthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OauthProvider::Google => "Google",
            OauthProvider::Github => "GitHub",
            OauthProvider::Apple => "Apple",
            OauthProvider::Email => "Email",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_role")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<UserRole>,
    pub oauth_provider: Option<OauthProvider>,
    /// Payment-provider customer id. Unset until the first paid order is
    /// reconciled for this user.
    pub customer_id: Option<String>,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct PublicUser {
    pub id: uuid::Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<UserRole>,
    pub customer_id: Option<String>,
}
