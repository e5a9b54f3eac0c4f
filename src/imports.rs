use std::io::Cursor;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use crate::db::insert_student;
use crate::error::AppError;
use crate::models::NewStudent;

/// One spreadsheet row, as exported by the institution's student list.
#[derive(Debug, Deserialize, Clone)]
pub struct StudentRow {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Father Name", default)]
    pub father_name: String,
    #[serde(rename = "Roll Number", default)]
    pub roll_number: String,
    #[serde(rename = "Registration Number", default)]
    pub registration_number: String,
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "Mobile", default)]
    pub mobile: String,
    #[serde(rename = "Course", default)]
    pub course: String,
    #[serde(rename = "Semester", default)]
    pub semester: String,
}

impl From<StudentRow> for NewStudent {
    fn from(row: StudentRow) -> Self {
        Self {
            name: row.name,
            father_name: row.father_name,
            roll_number: row.roll_number,
            registration_number: row.registration_number,
            email: row.email,
            mobile: row.mobile,
            course: row.course,
            semester: row.semester,
            ..Default::default()
        }
    }
}

/// A data row paired with its 1-based position in the upload. Rows that
/// failed CSV-level parsing carry the parse error instead of field values.
pub struct ParsedRow {
    pub row: usize,
    pub result: Result<StudentRow, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImportRowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ImportReport {
    pub inserted: usize,
    pub failed: usize,
    pub errors: Vec<ImportRowError>,
}

impl ImportReport {
    fn add_failure(&mut self, row: usize, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(ImportRowError {
            row,
            message: message.into(),
        });
    }
}

/// Parses an uploaded CSV into student rows. A malformed row is kept as a
/// per-row error rather than failing the upload; only an unusable header
/// row rejects the whole file.
pub fn parse_student_rows(data: &[u8]) -> Result<Vec<ParsedRow>, AppError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(data));

    let headers = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("Failed to read CSV headers: {}", e)))?;

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::Validation("CSV header row is empty".to_string()));
    }

    let rows = reader
        .deserialize::<StudentRow>()
        .enumerate()
        .map(|(idx, result)| ParsedRow {
            row: idx + 1,
            result: result.map_err(|e| format!("CSV parse error: {}", e)),
        })
        .collect();

    Ok(rows)
}

/// Inserts each row independently: a malformed or duplicate row is recorded
/// in the report and the batch continues. Infrastructure failures (pool
/// exhaustion, corrupted schema) still abort, since retrying the remaining
/// rows would fail the same way.
#[instrument(skip_all)]
pub async fn import_students(
    pool: &Pool<Sqlite>,
    rows: Vec<ParsedRow>,
) -> Result<ImportReport, AppError> {
    info!(rows = rows.len(), "Importing students");

    let mut report = ImportReport::default();

    for parsed in rows {
        let row = match parsed.result {
            Ok(row) => row,
            Err(message) => {
                warn!(row = parsed.row, message = %message, "Skipping malformed import row");
                report.add_failure(parsed.row, message);
                continue;
            }
        };

        let student = NewStudent::from(row);

        match insert_student(pool, &student, None).await {
            Ok(_) => report.inserted += 1,
            Err(AppError::DuplicateEmail(message)) | Err(AppError::Validation(message)) => {
                warn!(row = parsed.row, message = %message, "Skipping rejected import row");
                report.add_failure(parsed.row, message);
            }
            Err(other) => return Err(other),
        }
    }

    info!(
        inserted = report.inserted,
        failed = report.failed,
        "Import finished"
    );

    Ok(report)
}

pub async fn import_students_from_csv(
    pool: &Pool<Sqlite>,
    data: &[u8],
) -> Result<ImportReport, AppError> {
    let rows = parse_student_rows(data)?;
    import_students(pool, rows).await
}
