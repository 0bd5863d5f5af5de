#![allow(dead_code)]
use async_trait::async_trait;

use super::errors::GitHubAuthError;
use super::models::GitHubToken;
use super::service::{GitHubOAuthService, GitHubUserInfo};

#[derive(Default)]
pub struct MockGitHubOAuth {
    pub token_result: Option<GitHubToken>,
    pub user_info_result: Option<GitHubUserInfo>,
}

#[async_trait]
impl GitHubOAuthService for MockGitHubOAuth {
    async fn exchange_code_for_token(&self, _code: &str) -> Result<GitHubToken, GitHubAuthError> {
        self.token_result
            .clone()
            .ok_or(GitHubAuthError::TokenExchangeFailed)
    }

    async fn fetch_user_info(
        &self,
        _token: &GitHubToken,
    ) -> Result<GitHubUserInfo, GitHubAuthError> {
        self.user_info_result
            .clone()
            .ok_or(GitHubAuthError::UserInfoFetchFailed)
    }
}
