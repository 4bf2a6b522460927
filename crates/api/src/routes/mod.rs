pub mod admin;
pub mod health;
pub mod tc;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /tc/search                        public search
/// /tc/{id}/verify                   admission-number check (POST)
/// /tc/{id}/download                 signed PDF download
///
/// /admin/tc-records                 list, create (admin only)
/// /admin/tc-records/import          bulk create (POST)
/// /admin/tc-records/{id}            get, update
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tc", tc::router())
        .nest("/admin", admin::router())
}
