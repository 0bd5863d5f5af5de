use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::http::Method;
use axum::{
    http::HeaderName,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use skillforge_backend::config::Config;
use skillforge_backend::db::billing_repository::BillingRepository;
use skillforge_backend::db::postgres_billing_repository::PostgresBillingRepository;
use skillforge_backend::db::postgres_user_repository::PostgresUserRepository;
use skillforge_backend::db::user_repository::UserRepository;
use skillforge_backend::gate::subscription_gate;
use skillforge_backend::responses::JsonResponse;
use skillforge_backend::routes::auth::{
    github_login::{github_callback, github_login},
    handle_checkout, handle_login, handle_logout, handle_me, handle_signup,
};
use skillforge_backend::routes::challenges::{get_challenge, list_challenges, submit_solution};
use skillforge_backend::routes::webhooks::polar_webhook;
use skillforge_backend::services::billing::{BillingProvider, LivePolarService};
use skillforge_backend::services::challenge_store::ChallengeStore;
use skillforge_backend::services::judge::{Judge0Client, JudgeService};
use skillforge_backend::services::oauth::github::client::GitHubOAuthClient;
use skillforge_backend::state::AppState;
use skillforge_backend::utils::csrf::{get_csrf_token, validate_csrf};
use skillforge_backend::utils::jwt::JwtKeys;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let rate_limit_ms: u64 = std::env::var("RATE_LIMITER_MILLISECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        // Default: 200ms/token (~5 req/sec)
        .unwrap_or(200);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMITER_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        // Default: allow short bursts from the editor's polling
        .unwrap_or(20);
    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit_ms)
            .burst_size(rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    let rate_limit_auth_s: u64 = std::env::var("RATE_LIMITER_AUTH_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1);
    let rate_limit_auth_burst: u32 = std::env::var("RATE_LIMITER_AUTH_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10);
    // Stricter limiter for /api/auth/*
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(rate_limit_auth_s)
            .burst_size(rate_limit_auth_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Background task to cleanup old IPs
    let governor_limiter = global_governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let config = Arc::new(Config::from_env());
    let jwt_keys = Arc::new(JwtKeys::from_env().expect("Invalid JWT secret"));

    let pg_pool = establish_connection(&config.database_url).await;
    let user_repo = Arc::new(PostgresUserRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn UserRepository>;
    let billing_repo = Arc::new(PostgresBillingRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn BillingRepository>;

    let billing =
        Arc::new(LivePolarService::from_settings(&config.polar)) as Arc<dyn BillingProvider>;
    let judge = Arc::new(Judge0Client::from_settings(&config.judge)) as Arc<dyn JudgeService>;
    let challenges = Arc::new(ChallengeStore::load(&config.challenges_dir));

    let http_client = Client::new();
    let github_oauth = Arc::new(GitHubOAuthClient::new(
        http_client,
        config.oauth.github.clone(),
    ));

    let state = AppState {
        db: user_repo,
        billing_repo,
        billing,
        judge,
        challenges,
        github_oauth,
        config: config.clone(),
        jwt_keys,
    };

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .allow_credentials(true);

    let csrf_layer = ServiceBuilder::new().layer(axum::middleware::from_fn(validate_csrf));

    // Routes that require CSRF protection (unsafe HTTP methods)
    let csrf_protected_routes = Router::new()
        .route("/signup", post(handle_signup))
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .layer(csrf_layer);

    // Routes that do NOT require CSRF (safe methods and OAuth)
    let unprotected_routes = Router::new()
        .route("/me", get(handle_me))
        .route("/csrf-token", get(get_csrf_token))
        .route("/github-login", get(github_login))
        .route("/github-callback", get(github_callback))
        .route("/checkout/{slug}", get(handle_checkout));

    let auth_routes = csrf_protected_routes
        .merge(unprotected_routes)
        .layer(GovernorLayer {
            config: auth_governor_conf.clone(),
        });

    let app = Router::new()
        .route("/", get(root))
        .route("/challenge", get(challenge_page))
        .route("/success", get(success_page))
        .route("/api/challenges", get(list_challenges))
        .route("/api/challenge/{id}", get(get_challenge))
        .route("/api/submit", post(submit_solution))
        .route("/webhook/polar", post(polar_webhook))
        .nest("/api/auth", auth_routes)
        .with_state(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            state,
            subscription_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: global_governor_conf.clone(),
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    let listener = TcpListener::bind(addr).await.unwrap();
    info!("Listening on http://{}", addr);
    axum::serve(listener, make_service).await.unwrap();
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("SkillForge API").into_response()
}

/// Protected entry the gate guards; the SPA shell takes over from here.
async fn challenge_page() -> Response {
    JsonResponse::success("Challenge editor").into_response()
}

/// Post-checkout landing page; public so the provider redirect always lands.
async fn success_page() -> Response {
    JsonResponse::success("Payment received").into_response()
}

/// Establish a connection to the database, apply migrations, and verify it.
async fn establish_connection(database_url: &str) -> PgPool {
    let pool = PgPool::connect(database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("✅ Successfully connected to the database");
    pool
}
