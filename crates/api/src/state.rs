use std::sync::Arc;

use tcportal_db::store::RecordStore;

use crate::config::ServerConfig;
use crate::verification::TcVerificationService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (read by extractors and handlers).
    pub config: Arc<ServerConfig>,
    /// Transfer-certificate records.
    pub records: Arc<dyn RecordStore>,
    /// Verification and download-link flow.
    pub verification: Arc<TcVerificationService>,
}
