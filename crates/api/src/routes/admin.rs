//! Route definitions for the `/admin` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin_tc;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET    /tc-records              -> list_tc_records
/// POST   /tc-records              -> create_tc_record
/// POST   /tc-records/import       -> import_tc_records
/// GET    /tc-records/{id}         -> get_tc_record
/// PUT    /tc-records/{id}         -> update_tc_record
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/tc-records",
            get(admin_tc::list_tc_records).post(admin_tc::create_tc_record),
        )
        .route("/tc-records/import", post(admin_tc::import_tc_records))
        .route(
            "/tc-records/{id}",
            get(admin_tc::get_tc_record).put(admin_tc::update_tc_record),
        )
}
