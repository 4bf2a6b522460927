//! The record store seam used by the HTTP layer.
//!
//! [`PgRecordStore`] is the production implementation backed by
//! [`TcRecordRepo`]. [`MemoryRecordStore`] keeps records in process and is
//! used by tests and local demos.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use tcportal_core::admission;
use tcportal_core::types::DbId;

use crate::models::tc_record::{CreateTcRecord, TcRecord, UpdateTcRecord};
use crate::repositories::TcRecordRepo;
use crate::DbPool;

/// Name of the unique constraint on `tc_records.tc_number`.
const TC_NUMBER_CONSTRAINT: &str = "uq_tc_records_tc_number";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("A certificate with number {0} already exists")]
    DuplicateTcNumber(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Read and administrative write access to transfer-certificate records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every record, in insertion order.
    async fn list_all(&self) -> Result<Vec<TcRecord>, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<TcRecord>, StoreError>;

    async fn create(&self, input: &CreateTcRecord) -> Result<TcRecord, StoreError>;

    /// All-or-nothing bulk insert.
    async fn create_many(&self, inputs: &[CreateTcRecord]) -> Result<Vec<TcRecord>, StoreError>;

    async fn update(
        &self,
        id: DbId,
        input: &UpdateTcRecord,
    ) -> Result<Option<TcRecord>, StoreError>;

    /// Whether the backing storage is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map a unique violation on the certificate number to [`StoreError::DuplicateTcNumber`].
fn classify_insert_error(err: sqlx::Error, tc_number: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(TC_NUMBER_CONSTRAINT)
        {
            return StoreError::DuplicateTcNumber(tc_number.to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list_all(&self) -> Result<Vec<TcRecord>, StoreError> {
        Ok(TcRecordRepo::list_all(&self.pool).await?)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<TcRecord>, StoreError> {
        Ok(TcRecordRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create(&self, input: &CreateTcRecord) -> Result<TcRecord, StoreError> {
        TcRecordRepo::create(&self.pool, input)
            .await
            .map_err(|e| classify_insert_error(e, &input.tc_number))
    }

    async fn create_many(&self, inputs: &[CreateTcRecord]) -> Result<Vec<TcRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let record = TcRecordRepo::create_with(&mut *tx, input)
                .await
                .map_err(|e| classify_insert_error(e, &input.tc_number))?;
            created.push(record);
        }
        tx.commit().await?;
        tracing::debug!(count = created.len(), "Bulk-inserted TC records");
        Ok(created)
    }

    async fn update(
        &self,
        id: DbId,
        input: &UpdateTcRecord,
    ) -> Result<Option<TcRecord>, StoreError> {
        Ok(TcRecordRepo::update(&self.pool, id, input).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    rows: Vec<TcRecord>,
    next_id: DbId,
}

impl MemoryInner {
    fn build(&self, id: DbId, input: &CreateTcRecord) -> TcRecord {
        let now = Utc::now();
        TcRecord {
            id,
            tc_number: input.tc_number.clone(),
            student_name: input.student_name.clone(),
            father_name: input.father_name.clone(),
            class: input.class.clone(),
            admission_number: admission::normalize(&input.admission_number).to_string(),
            date_of_issue: input.date_of_issue,
            artifact_path: input.artifact_path.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn has_tc_number(&self, tc_number: &str) -> bool {
        self.rows.iter().any(|r| r.tc_number == tc_number)
    }
}

/// Process-local record store.
#[derive(Debug)]
pub struct MemoryRecordStore {
    inner: RwLock<MemoryInner>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::with_records(Vec::new())
    }
}

impl MemoryRecordStore {
    /// Seed the store with existing rows. New ids continue after the largest seeded id.
    pub fn with_records(rows: Vec<TcRecord>) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            inner: RwLock::new(MemoryInner { rows, next_id }),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_all(&self) -> Result<Vec<TcRecord>, StoreError> {
        Ok(self.inner.read().await.rows.clone())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<TcRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn create(&self, input: &CreateTcRecord) -> Result<TcRecord, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.has_tc_number(&input.tc_number) {
            return Err(StoreError::DuplicateTcNumber(input.tc_number.clone()));
        }
        let record = inner.build(inner.next_id, input);
        inner.next_id += 1;
        inner.rows.push(record.clone());
        Ok(record)
    }

    async fn create_many(&self, inputs: &[CreateTcRecord]) -> Result<Vec<TcRecord>, StoreError> {
        let mut inner = self.inner.write().await;

        // Validate the whole batch before touching any row.
        let mut seen = std::collections::HashSet::new();
        for input in inputs {
            if inner.has_tc_number(&input.tc_number) || !seen.insert(input.tc_number.as_str()) {
                return Err(StoreError::DuplicateTcNumber(input.tc_number.clone()));
            }
        }

        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let record = inner.build(inner.next_id, input);
            inner.next_id += 1;
            inner.rows.push(record.clone());
            created.push(record);
        }
        Ok(created)
    }

    async fn update(
        &self,
        id: DbId,
        input: &UpdateTcRecord,
    ) -> Result<Option<TcRecord>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(row) = inner.rows.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        if let Some(v) = &input.student_name {
            row.student_name = v.clone();
        }
        if let Some(v) = &input.father_name {
            row.father_name = v.clone();
        }
        if let Some(v) = &input.class {
            row.class = v.clone();
        }
        if let Some(v) = &input.admission_number {
            row.admission_number = admission::normalize(v).to_string();
        }
        if let Some(v) = input.date_of_issue {
            row.date_of_issue = v;
        }
        if let Some(v) = &input.artifact_path {
            row.artifact_path = v.clone();
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn input(tc_number: &str) -> CreateTcRecord {
        CreateTcRecord {
            tc_number: tc_number.to_string(),
            student_name: "Aarav Singh".to_string(),
            father_name: "Rohit Singh".to_string(),
            class: "10".to_string(),
            admission_number: " ADM1234 ".to_string(),
            date_of_issue: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            artifact_path: "2024/TC-2024-001.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_trims_admission() {
        let store = MemoryRecordStore::default();
        let a = store.create(&input("TC-1")).await.unwrap();
        let b = store.create(&input("TC-2")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(a.admission_number, "ADM1234");
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_tc_number_is_rejected() {
        let store = MemoryRecordStore::default();
        store.create(&input("TC-1")).await.unwrap();
        let err = store.create(&input("TC-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTcNumber(n) if n == "TC-1"));
    }

    #[tokio::test]
    async fn bulk_create_is_all_or_nothing() {
        let store = MemoryRecordStore::default();
        store.create(&input("TC-1")).await.unwrap();

        let err = store
            .create_many(&[input("TC-2"), input("TC-1")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTcNumber(_)));
        assert_eq!(store.list_all().await.unwrap().len(), 1);

        let created = store
            .create_many(&[input("TC-2"), input("TC-3")])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let store = MemoryRecordStore::default();
        let rec = store.create(&input("TC-1")).await.unwrap();

        let patch = UpdateTcRecord {
            class: Some("11".to_string()),
            ..Default::default()
        };
        let updated = store.update(rec.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.class, "11");
        assert_eq!(updated.student_name, rec.student_name);
        assert_eq!(updated.tc_number, rec.tc_number);

        assert!(store.update(999, &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seeded_ids_continue_after_max() {
        let store = MemoryRecordStore::default();
        let seeded = store.create(&input("TC-1")).await.unwrap();
        let mut row = seeded.clone();
        row.id = 42;

        let store = MemoryRecordStore::with_records(vec![row]);
        let next = store.create(&input("TC-2")).await.unwrap();
        assert_eq!(next.id, 43);
        assert!(store.find_by_id(42).await.unwrap().is_some());
    }
}
