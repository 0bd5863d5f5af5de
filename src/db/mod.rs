pub mod billing_repository;
pub mod mock_db;
pub mod postgres_billing_repository;
pub mod postgres_user_repository;
pub mod user_repository;
