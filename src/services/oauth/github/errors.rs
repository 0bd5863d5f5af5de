use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GitHubAuthError {
    #[error("Missing OAuth state cookie")]
    MissingStateCookie,
    #[error("OAuth state mismatch")]
    InvalidState,
    #[error("GitHub token exchange failed")]
    TokenExchangeFailed,
    #[error("GitHub returned an invalid token response")]
    InvalidTokenJson,
    #[error("Failed to fetch GitHub user info")]
    UserInfoFetchFailed,
    #[error("Failed to fetch GitHub email addresses")]
    EmailFetchFailed,
    #[error("No verified primary email on the GitHub account")]
    NoVerifiedEmail,
    #[error("Failed to create user account")]
    UserCreationFailed,
}
