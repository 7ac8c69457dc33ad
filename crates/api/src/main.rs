use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photolift_admission::{RestFreeCreditMarker, RestStore, SlidingWindowLimiter};
use photolift_core::admission::{AdmissionControl, FreeCreditMarker};
use photolift_core::jobs::RestorationJobs;
use photolift_core::ledger::CreditLedger;
use photolift_db::PgCreditLedger;
use photolift_inference::RestorationApi;

use photolift_api::config::ServerConfig;
use photolift_api::orchestrator::RestoreOrchestrator;
use photolift_api::router::build_app_router;
use photolift_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photolift_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = photolift_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    photolift_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    photolift_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Fast store (admission control + free-credit marker) ---
    let (admission, marker): (Arc<dyn AdmissionControl>, Arc<dyn FreeCreditMarker>) =
        match &config.fast_store {
            Some(fs) => {
                let store = RestStore::new(fs.url.clone(), fs.token.clone());
                tracing::info!(url = %fs.url, "Fast store configured");
                (
                    Arc::new(SlidingWindowLimiter::new(store.clone())),
                    Arc::new(RestFreeCreditMarker::new(store)),
                )
            }
            None => {
                tracing::warn!(
                    "No fast store configured; admission control fails open and the free pool is disabled"
                );
                (
                    Arc::new(SlidingWindowLimiter::disabled()),
                    Arc::new(RestFreeCreditMarker::disabled()),
                )
            }
        };

    // --- Clients ---
    let ledger: Arc<dyn CreditLedger> =
        Arc::new(PgCreditLedger::new(pool.clone(), Arc::clone(&marker)));

    let jobs: Arc<dyn RestorationJobs> = Arc::new(RestorationApi::new(
        config.inference.api_url.clone(),
        config.inference.api_token.clone(),
        config.inference.model_version.clone(),
    ));

    let orchestrator = Arc::new(RestoreOrchestrator::new(
        Arc::clone(&ledger),
        jobs,
        admission,
        marker,
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ledger,
        orchestrator,
    };

    // --- Router ---
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

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
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
