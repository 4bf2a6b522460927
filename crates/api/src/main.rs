use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tcportal_api::background::attempt_pruning;
use tcportal_api::challenge::build_challenge_verifier;
use tcportal_api::config::{RateLimitBackend, ServerConfig};
use tcportal_api::router::build_app_router;
use tcportal_api::state::AppState;
use tcportal_api::verification::TcVerificationService;
use tcportal_core::clock::{Clock, SystemClock};
use tcportal_core::download_token::DownloadSigner;
use tcportal_core::rate_limit::{AttemptLimiter, InMemoryAttemptLimiter};
use tcportal_db::limiter::PgAttemptLimiter;
use tcportal_db::store::{PgRecordStore, RecordStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tcportal_api=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        app_env = %config.app_env,
        challenge_mode = ?config.challenge.mode,
        rate_limit_backend = ?config.rate_limit.backend,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = tcportal_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    tcportal_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    tcportal_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Verification collaborators ---
    let records: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let policy = config.rate_limit.policy();
    let limiter: Arc<dyn AttemptLimiter> = match config.rate_limit.backend {
        RateLimitBackend::Memory => Arc::new(InMemoryAttemptLimiter::new(policy)),
        RateLimitBackend::Postgres => Arc::new(PgAttemptLimiter::new(pool.clone(), policy)),
    };

    let challenge =
        build_challenge_verifier(&config.challenge).expect("Failed to build challenge HTTP client");

    let signer = DownloadSigner::new(
        config.download.signing_secret.as_bytes(),
        chrono::Duration::seconds(config.download.ttl_secs),
    );

    let verification = Arc::new(TcVerificationService::new(
        Arc::clone(&records),
        challenge,
        Arc::clone(&limiter),
        signer,
        Arc::clone(&clock),
        config.download.artifact_root.clone(),
        config.download.public_base_url.clone(),
    ));

    // --- Attempt pruning ---
    let prune_cancel = tokio_util::sync::CancellationToken::new();
    let prune_handle = tokio::spawn(attempt_pruning::run(
        Arc::clone(&limiter),
        Arc::clone(&clock),
        config.rate_limit.retention(),
        attempt_pruning::PRUNE_INTERVAL,
        prune_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        records,
        verification,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Peer addresses feed the rate-limit key.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    prune_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), prune_handle).await;
    tracing::info!("Attempt pruning job stopped");

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
