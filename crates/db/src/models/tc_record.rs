//! Transfer-certificate record model and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tcportal_core::search::Searchable;
use tcportal_core::types::{DbId, Timestamp};
use validator::Validate;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `tc_records` table.
///
/// **Note:** this carries the admission number and artifact path and is only
/// serialized by admin handlers. Public responses use [`PublicTcRecord`].
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TcRecord {
    pub id: DbId,
    pub tc_number: String,
    pub student_name: String,
    pub father_name: String,
    pub class: String,
    pub admission_number: String,
    pub date_of_issue: NaiveDate,
    pub artifact_path: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Searchable for TcRecord {
    fn search_fields(&self) -> [&str; 4] {
        [
            &self.student_name,
            &self.father_name,
            &self.class,
            &self.tc_number,
        ]
    }
}

/// The fields of a record that may be shown to the public.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicTcRecord {
    pub id: DbId,
    pub tc_number: String,
    pub student_name: String,
    pub father_name: String,
    pub class: String,
    pub date_of_issue: NaiveDate,
}

impl From<TcRecord> for PublicTcRecord {
    fn from(r: TcRecord) -> Self {
        Self {
            id: r.id,
            tc_number: r.tc_number,
            student_name: r.student_name,
            father_name: r.father_name,
            class: r.class,
            date_of_issue: r.date_of_issue,
        }
    }
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// DTO for creating a record.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTcRecord {
    #[validate(length(min = 1, max = 50))]
    pub tc_number: String,
    #[validate(length(min = 1, max = 150))]
    pub student_name: String,
    #[validate(length(min = 1, max = 150))]
    pub father_name: String,
    #[validate(length(min = 1, max = 20))]
    pub class: String,
    #[validate(length(min = 1, max = 64))]
    pub admission_number: String,
    pub date_of_issue: NaiveDate,
    #[validate(length(min = 1, max = 500))]
    pub artifact_path: String,
}

/// DTO for partially updating a record. `tc_number` is immutable.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTcRecord {
    #[validate(length(min = 1, max = 150))]
    pub student_name: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub father_name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub class: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub admission_number: Option<String>,
    pub date_of_issue: Option<NaiveDate>,
    #[validate(length(min = 1, max = 500))]
    pub artifact_path: Option<String>,
}
