use async_trait::async_trait;
use reqwest::Client;

use crate::config::OAuthProviderConfig;

use super::errors::GitHubAuthError;
use super::models::GitHubToken;
use super::service::{GitHubOAuthService, GitHubUserInfo};

#[derive(Clone)]
pub struct GitHubOAuthClient {
    client: Client,
    config: OAuthProviderConfig,
    token_url: String,
    api_base: String,
}

impl GitHubOAuthClient {
    pub fn new(client: Client, config: OAuthProviderConfig) -> Self {
        Self {
            client,
            config,
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            api_base: "https://api.github.com".to_string(),
        }
    }

    #[cfg(test)]
    fn with_endpoints(mut self, token_url: &str, api_base: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_base = api_base.to_string();
        self
    }
}

#[async_trait]
impl GitHubOAuthService for GitHubOAuthClient {
    async fn exchange_code_for_token(&self, code: &str) -> Result<GitHubToken, GitHubAuthError> {
        let res = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json") // JSON instead of URL-encoded response
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|_| GitHubAuthError::TokenExchangeFailed)?;

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|_| GitHubAuthError::InvalidTokenJson)?;

        let access_token = json["access_token"]
            .as_str()
            .ok_or(GitHubAuthError::InvalidTokenJson)?;
        Ok(GitHubToken {
            access_token: access_token.to_string(),
        })
    }

    async fn fetch_user_info(
        &self,
        token: &GitHubToken,
    ) -> Result<GitHubUserInfo, GitHubAuthError> {
        let user_resp = self
            .client
            .get(format!("{}/user", self.api_base))
            .bearer_auth(&token.access_token)
            .header("User-Agent", "skillforge")
            .send()
            .await
            .map_err(|_| GitHubAuthError::UserInfoFetchFailed)?;

        let user_json: serde_json::Value = user_resp
            .json()
            .await
            .map_err(|_| GitHubAuthError::UserInfoFetchFailed)?;

        let email_resp = self
            .client
            .get(format!("{}/user/emails", self.api_base))
            .bearer_auth(&token.access_token)
            .header("User-Agent", "skillforge")
            .send()
            .await
            .map_err(|_| GitHubAuthError::EmailFetchFailed)?;

        let emails: Vec<serde_json::Value> = email_resp
            .json()
            .await
            .map_err(|_| GitHubAuthError::EmailFetchFailed)?;

        let email = emails
            .iter()
            .find(|e| e["verified"].as_bool() == Some(true) && e["primary"].as_bool() == Some(true))
            .and_then(|e| e["email"].as_str())
            .ok_or(GitHubAuthError::NoVerifiedEmail)?
            .to_string();

        let full_name = user_json["name"].as_str().unwrap_or("").to_string();
        let login = user_json["login"].as_str().unwrap_or("").to_string();

        let (first_name, last_name) = if !full_name.is_empty() {
            let mut parts = full_name.split_whitespace();
            let first = parts.next().unwrap_or("").to_string();
            let last = parts.collect::<Vec<_>>().join(" ");
            (first, last)
        } else {
            (login.clone(), "".to_string())
        };

        Ok(GitHubUserInfo {
            email,
            first_name,
            last_name,
        })
    }
}
