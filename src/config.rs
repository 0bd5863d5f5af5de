use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Clone, Debug)]
pub struct OAuthSettings {
    pub github: OAuthProviderConfig,
}

/// Which Polar environment the live billing client talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolarServer {
    Sandbox,
    Production,
}

impl PolarServer {
    pub fn api_base(&self) -> &'static str {
        match self {
            PolarServer::Sandbox => "https://sandbox-api.polar.sh",
            PolarServer::Production => "https://api.polar.sh",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PolarSettings {
    pub access_token: String,
    pub webhook_secret: String,
    pub server: PolarServer,
    /// Product the checkout route sells, addressed by slug in the URL.
    pub product_id: String,
    pub product_slug: String,
    pub success_url: String,
}

#[derive(Clone, Debug)]
pub struct JudgeSettings {
    pub base_url: String,
    pub language_id: i64,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub port: u16,
    pub challenges_dir: PathBuf,
    pub auth_cookie_secure: bool,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub oauth: OAuthSettings,
    pub polar: PolarSettings,
    pub judge: JudgeSettings,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);

        let challenges_dir = env::var("CHALLENGES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./challenges"));

        let auth_cookie_secure = env::var("AUTH_COOKIE_SECURE")
            .map(|v| v != "false")
            .unwrap_or(true);

        let oauth = OAuthSettings {
            github: OAuthProviderConfig {
                client_id: env::var("GITHUB_CLIENT_ID").expect("GITHUB_CLIENT_ID must be set"),
                client_secret: env::var("GITHUB_CLIENT_SECRET")
                    .expect("GITHUB_CLIENT_SECRET must be set"),
                redirect_uri: env::var("GITHUB_REDIRECT_URI")
                    .expect("GITHUB_REDIRECT_URI must be set"),
            },
        };

        let polar = PolarSettings {
            access_token: env::var("POLAR_ACCESS_TOKEN").expect("POLAR_ACCESS_TOKEN must be set"),
            webhook_secret: env::var("POLAR_WEBHOOK_SECRET")
                .expect("POLAR_WEBHOOK_SECRET must be set"),
            server: match env::var("POLAR_SERVER").as_deref() {
                Ok("production") => PolarServer::Production,
                _ => PolarServer::Sandbox,
            },
            product_id: env::var("POLAR_PRODUCT_ID").expect("POLAR_PRODUCT_ID must be set"),
            product_slug: env::var("POLAR_PRODUCT_SLUG").unwrap_or_else(|_| "course".to_string()),
            success_url: env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| "/success?checkout_id={CHECKOUT_ID}".to_string()),
        };

        let judge = JudgeSettings {
            base_url: env::var("JUDGE0_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:2358".to_string()),
            language_id: env::var("JUDGE0_LANGUAGE_ID")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(50),
            poll_interval_ms: 500,
            max_polls: 20,
        };

        Config {
            database_url,
            frontend_origin,
            port,
            challenges_dir,
            auth_cookie_secure,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "skillforge".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "skillforge-web".to_string()),
            oauth,
            polar,
            judge,
        }
    }

    /// Path the gate redirects unsubscribed users to.
    pub fn checkout_path(&self) -> String {
        format!("/api/auth/checkout/{}", self.polar.product_slug)
    }
}

#[cfg(test)]
pub fn test_config() -> std::sync::Arc<Config> {
    std::sync::Arc::new(Config {
        database_url: String::new(),
        frontend_origin: "https://app.example.com".into(),
        port: 3000,
        challenges_dir: PathBuf::from("./challenges"),
        auth_cookie_secure: true,
        jwt_issuer: "test-issuer".into(),
        jwt_audience: "test-audience".into(),
        oauth: OAuthSettings {
            github: OAuthProviderConfig {
                client_id: "client".into(),
                client_secret: "secret".into(),
                redirect_uri: "https://app.example.com/api/auth/github-callback".into(),
            },
        },
        polar: PolarSettings {
            access_token: "polar_oat_test".into(),
            webhook_secret: "0123456789abcdef0123456789abcdef".into(),
            server: PolarServer::Sandbox,
            product_id: "9398d8de-c3c3-423e-b515-52f8b5f67596".into(),
            product_slug: "course".into(),
            success_url: "/success?checkout_id={CHECKOUT_ID}".into(),
        },
        judge: JudgeSettings {
            base_url: "http://127.0.0.1:2358".into(),
            language_id: 50,
            poll_interval_ms: 1,
            max_polls: 3,
        },
    })
}
