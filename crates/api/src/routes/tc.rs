//! Route definitions for the public `/tc` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tc;
use crate::state::AppState;

/// Routes mounted at `/tc`.
///
/// ```text
/// GET    /search?query=           -> search_records
/// POST   /{id}/verify             -> verify_record
/// GET    /{id}/download           -> download_certificate
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(tc::search_records))
        .route("/{id}/verify", post(tc::verify_record))
        .route("/{id}/download", get(tc::download_certificate))
}
