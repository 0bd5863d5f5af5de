use std::sync::Arc;

use crate::config::Config;
use crate::db::{billing_repository::BillingRepository, user_repository::UserRepository};
use crate::services::billing::BillingProvider;
use crate::services::challenge_store::ChallengeStore;
use crate::services::judge::JudgeService;
use crate::services::oauth::github::service::GitHubOAuthService;
use crate::utils::jwt::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn UserRepository>,
    pub billing_repo: Arc<dyn BillingRepository>,
    pub billing: Arc<dyn BillingProvider>,
    pub judge: Arc<dyn JudgeService>,
    pub challenges: Arc<ChallengeStore>,
    pub github_oauth: Arc<dyn GitHubOAuthService>,
    pub config: Arc<Config>,
    pub jwt_keys: Arc<JwtKeys>,
}

#[cfg(test)]
pub fn test_state(
    db: Arc<dyn UserRepository>,
    billing_repo: Arc<dyn BillingRepository>,
    billing: Arc<dyn BillingProvider>,
    judge: Arc<dyn JudgeService>,
    challenges: Arc<ChallengeStore>,
) -> AppState {
    AppState {
        db,
        billing_repo,
        billing,
        judge,
        challenges,
        github_oauth: Arc::new(
            crate::services::oauth::github::mock_github_oauth::MockGitHubOAuth::default(),
        ),
        config: crate::config::test_config(),
        jwt_keys: Arc::new(
            JwtKeys::from_secret("0123456789abcdef0123456789abcdef")
                .expect("test JWT secret should be valid"),
        ),
    }
}
