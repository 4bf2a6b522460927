//! Admin handlers for transfer-certificate records.
//!
//! All endpoints require the `admin` role. Artifacts are referenced by a
//! path relative to `ARTIFACT_ROOT`; uploading the PDF itself happens
//! outside this service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use validator::Validate;

use tcportal_core::admission;
use tcportal_core::artifact;
use tcportal_core::error::CoreError;
use tcportal_core::types::DbId;
use tcportal_db::models::tc_record::{CreateTcRecord, TcRecord, UpdateTcRecord};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Largest batch accepted by the bulk import endpoint.
pub const MAX_IMPORT_BATCH: usize = 1000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ensure_admission_number(value: &str) -> AppResult<()> {
    if admission::normalize(value).is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "admission_number must not be blank".into(),
        )));
    }
    Ok(())
}

fn validate_create(input: &CreateTcRecord) -> AppResult<()> {
    input.validate()?;
    ensure_admission_number(&input.admission_number)?;
    artifact::validate_relative_path(&input.artifact_path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /admin/tc-records
// ---------------------------------------------------------------------------

/// List every record including admission numbers and artifact paths.
pub async fn list_tc_records(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<TcRecord>>>> {
    let records = state.records.list_all().await?;
    Ok(Json(DataResponse { data: records }))
}

// ---------------------------------------------------------------------------
// POST /admin/tc-records
// ---------------------------------------------------------------------------

pub async fn create_tc_record(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTcRecord>,
) -> AppResult<impl IntoResponse> {
    validate_create(&input)?;

    let record = state.records.create(&input).await?;

    tracing::info!(
        record_id = record.id,
        tc_number = %record.tc_number,
        admin_id = admin.user_id,
        "Certificate record created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

// ---------------------------------------------------------------------------
// POST /admin/tc-records/import
// ---------------------------------------------------------------------------

/// Bulk-create records. Either every row is inserted or none is.
pub async fn import_tc_records(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(inputs): Json<Vec<CreateTcRecord>>,
) -> AppResult<impl IntoResponse> {
    if inputs.is_empty() {
        return Err(AppError::BadRequest("Import batch is empty".into()));
    }
    if inputs.len() > MAX_IMPORT_BATCH {
        return Err(AppError::BadRequest(format!(
            "Import batch exceeds {MAX_IMPORT_BATCH} records"
        )));
    }

    for (index, input) in inputs.iter().enumerate() {
        validate_create(input).map_err(|e| match e {
            AppError::Core(CoreError::Validation(msg)) => {
                AppError::Core(CoreError::Validation(format!("row {index}: {msg}")))
            }
            other => other,
        })?;
    }

    let records = state.records.create_many(&inputs).await?;

    tracing::info!(
        count = records.len(),
        admin_id = admin.user_id,
        "Certificate records imported"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: records })))
}

// ---------------------------------------------------------------------------
// GET /admin/tc-records/{id}
// ---------------------------------------------------------------------------

pub async fn get_tc_record(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TcRecord>>> {
    let record = state
        .records
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TcRecord",
            id,
        }))?;
    Ok(Json(DataResponse { data: record }))
}

// ---------------------------------------------------------------------------
// PUT /admin/tc-records/{id}
// ---------------------------------------------------------------------------

/// Edit mutable fields. `tc_number` cannot be changed.
pub async fn update_tc_record(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTcRecord>,
) -> AppResult<Json<DataResponse<TcRecord>>> {
    input.validate()?;
    if let Some(value) = &input.admission_number {
        ensure_admission_number(value)?;
    }
    if let Some(path) = &input.artifact_path {
        artifact::validate_relative_path(path)?;
    }

    let record = state
        .records
        .update(id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TcRecord",
            id,
        }))?;

    tracing::info!(record_id = id, admin_id = admin.user_id, "Certificate record updated");

    Ok(Json(DataResponse { data: record }))
}
