use std::sync::Arc;

use photolift_core::ledger::CreditLedger;

use crate::config::ServerConfig;
use crate::orchestrator::RestoreOrchestrator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// The clients are the process-scoped singletons: constructed once at
/// startup (or by tests, with fakes) and injected everywhere. This is
/// cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (webhook handlers use repositories directly).
    pub pool: photolift_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Credit ledger (credits endpoint and orchestrator).
    pub ledger: Arc<dyn CreditLedger>,
    /// Restoration orchestrator (restore endpoint).
    pub orchestrator: Arc<RestoreOrchestrator>,
}
