//! Repository for the `tc_records` table.

use sqlx::PgPool;
use tcportal_core::types::DbId;

use crate::models::tc_record::{CreateTcRecord, TcRecord, UpdateTcRecord};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, tc_number, student_name, father_name, class, admission_number, \
    date_of_issue, artifact_path, created_at, updated_at";

/// Provides CRUD operations for transfer-certificate records.
pub struct TcRecordRepo;

impl TcRecordRepo {
    /// List every record in insertion order.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<TcRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tc_records ORDER BY id");
        sqlx::query_as::<_, TcRecord>(&query).fetch_all(pool).await
    }

    /// Find a record by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TcRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tc_records WHERE id = $1");
        sqlx::query_as::<_, TcRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a record, returning the created row.
    ///
    /// The admission number is stored trimmed.
    pub async fn create(pool: &PgPool, input: &CreateTcRecord) -> Result<TcRecord, sqlx::Error> {
        Self::create_with(pool, input).await
    }

    /// Update a record. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTcRecord,
    ) -> Result<Option<TcRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE tc_records SET \
                 student_name = COALESCE($2, student_name), \
                 father_name = COALESCE($3, father_name), \
                 class = COALESCE($4, class), \
                 admission_number = COALESCE($5, admission_number), \
                 date_of_issue = COALESCE($6, date_of_issue), \
                 artifact_path = COALESCE($7, artifact_path) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TcRecord>(&query)
            .bind(id)
            .bind(&input.student_name)
            .bind(&input.father_name)
            .bind(&input.class)
            .bind(
                input
                    .admission_number
                    .as_deref()
                    .map(tcportal_core::admission::normalize),
            )
            .bind(input.date_of_issue)
            .bind(&input.artifact_path)
            .fetch_optional(pool)
            .await
    }

    /// Insert a record through any executor, e.g. an open transaction.
    pub async fn create_with<'e, E>(
        executor: E,
        input: &CreateTcRecord,
    ) -> Result<TcRecord, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO tc_records \
                (tc_number, student_name, father_name, class, admission_number, \
                 date_of_issue, artifact_path) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TcRecord>(&query)
            .bind(&input.tc_number)
            .bind(&input.student_name)
            .bind(&input.father_name)
            .bind(&input.class)
            .bind(tcportal_core::admission::normalize(&input.admission_number))
            .bind(input.date_of_issue)
            .bind(&input.artifact_path)
            .fetch_one(executor)
            .await
    }
}
