use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubToken {
    pub access_token: String,
}

/// Query parameters GitHub appends to the callback redirect.
#[derive(Debug, Deserialize)]
pub struct GitHubCallback {
    pub code: String,
    pub state: String,
}
