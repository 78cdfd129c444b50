use formscan_core::{MissingWorksheetPolicy, SheetRow, DEFAULT_WORKSHEET, ROW_WIDTH};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::a1::A1Range;
use crate::backend::{SheetsBackend, Spreadsheet, Worksheet};
use crate::error::SheetsError;
use crate::locator::{LocatorError, SpreadsheetId};

/// Rows given to a freshly created worksheet.
pub const NEW_WORKSHEET_ROWS: u32 = 1000;
/// Minimum columns given to a freshly created worksheet.
pub const NEW_WORKSHEET_MIN_COLUMNS: u32 = 10;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Invalid spreadsheet locator: {0}")]
    Locator(#[from] LocatorError),
    #[error("Spreadsheet not found. Check the URL and that it is shared with this account. ({0})")]
    SpreadsheetNotFound(String),
    #[error("Could not open spreadsheet: {0}")]
    Open(#[source] SheetsError),
    #[error("Failed to create worksheet '{name}': {source}")]
    CreateWorksheet {
        name: String,
        #[source]
        source: SheetsError,
    },
    #[error("Failed to read worksheet '{worksheet}': {source}")]
    ReadValues {
        worksheet: String,
        #[source]
        source: SheetsError,
    },
    #[error("Failed to write to worksheet '{worksheet}' at row {row}: {source}")]
    Update {
        worksheet: String,
        row: u32,
        #[source]
        source: SheetsError,
    },
}

/// Where a row landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenRow {
    pub spreadsheet: String,
    pub worksheet: String,
    pub row: u32,
    /// Cell range, e.g. `A4:F4`.
    pub range: String,
    /// The requested worksheet could not be created and another one was used.
    pub fell_back: bool,
}

/// `(success, message)` result of a write. Never carries an error value out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub success: bool,
    pub message: String,
    pub written: Option<WrittenRow>,
}

impl WriteOutcome {
    pub fn into_pair(self) -> (bool, String) {
        (self.success, self.message)
    }
}

impl From<Result<WrittenRow, WriteError>> for WriteOutcome {
    fn from(result: Result<WrittenRow, WriteError>) -> Self {
        match result {
            Ok(row) => {
                let mut message = format!("Wrote row at {} in worksheet '{}'", row.range, row.worksheet);
                if row.fell_back {
                    message.push_str(" (fallback: requested worksheet could not be created)");
                }
                WriteOutcome { success: true, message, written: Some(row) }
            }
            Err(e) => WriteOutcome { success: false, message: e.to_string(), written: None },
        }
    }
}

/// Appends one six-column row per call below a worksheet's existing data.
///
/// The backend handle is built once by the caller and reused across calls;
/// the writer keeps no other state.
pub struct SheetWriter<B: SheetsBackend> {
    backend: B,
    policy: MissingWorksheetPolicy,
}

impl<B: SheetsBackend> SheetWriter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, policy: MissingWorksheetPolicy::default() }
    }

    pub fn with_policy(mut self, policy: MissingWorksheetPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Write to the default "Health Records" worksheet.
    pub async fn write_default(&self, values: &[String], locator: &str) -> WriteOutcome {
        self.write(values, locator, DEFAULT_WORKSHEET).await
    }

    /// Write `values` as the next row of `worksheet_name`. All failures are
    /// reported in the outcome.
    pub async fn write(&self, values: &[String], locator: &str, worksheet_name: &str) -> WriteOutcome {
        let outcome = WriteOutcome::from(self.try_write(values, locator, worksheet_name).await);
        if outcome.success {
            info!(message = %outcome.message, "sheet row written");
        } else {
            warn!(message = %outcome.message, "sheet write failed");
        }
        outcome
    }

    pub async fn try_write(
        &self,
        values: &[String],
        locator: &str,
        worksheet_name: &str,
    ) -> Result<WrittenRow, WriteError> {
        let id = SpreadsheetId::parse(locator)?;
        let spreadsheet = self.backend.open(&id).await.map_err(|e| match e {
            SheetsError::NotFound(msg) => WriteError::SpreadsheetNotFound(msg),
            other => WriteError::Open(other),
        })?;
        info!(spreadsheet = %spreadsheet.title, "opened spreadsheet");

        let (worksheet, fell_back) = self
            .resolve_worksheet(&id, &spreadsheet, worksheet_name, values.len())
            .await?;

        let existing = self
            .backend
            .get_all_values(&id, &worksheet.title)
            .await
            .map_err(|source| WriteError::ReadValues { worksheet: worksheet.title.clone(), source })?;
        let row = existing.len() as u32 + 1;

        let cells = SheetRow::from_values(values.iter().cloned()).into_vec();
        let range = A1Range::row_from_a(worksheet.title.clone(), row, ROW_WIDTH as u32);
        self.backend
            .update_values(&id, &range, &[cells])
            .await
            .map_err(|source| WriteError::Update { worksheet: worksheet.title.clone(), row, source })?;

        Ok(WrittenRow {
            spreadsheet: spreadsheet.title,
            worksheet: worksheet.title,
            row,
            range: range.cells(),
            fell_back,
        })
    }

    async fn resolve_worksheet(
        &self,
        id: &SpreadsheetId,
        spreadsheet: &Spreadsheet,
        name: &str,
        value_count: usize,
    ) -> Result<(Worksheet, bool), WriteError> {
        if let Some(ws) = spreadsheet.find_worksheet(name) {
            return Ok((ws.clone(), false));
        }

        let name = name.trim();
        let columns = NEW_WORKSHEET_MIN_COLUMNS.max(value_count as u32);
        info!(worksheet = name, "worksheet not found, creating it");

        match self.backend.add_worksheet(id, name, NEW_WORKSHEET_ROWS, columns).await {
            Ok(ws) => {
                info!(worksheet = %ws.title, "created worksheet");
                Ok((ws, false))
            }
            Err(source) if source.is_permission_denied() => match (self.policy, spreadsheet.worksheets.first()) {
                (MissingWorksheetPolicy::FallbackToFirst, Some(first)) => {
                    warn!(
                        requested = name,
                        fallback = %first.title,
                        error = %source,
                        "cannot create worksheet, writing to the first worksheet instead"
                    );
                    Ok((first.clone(), true))
                }
                _ => Err(WriteError::CreateWorksheet { name: name.to_string(), source }),
            },
            Err(source) => Err(WriteError::CreateWorksheet { name: name.to_string(), source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    const SHEET: &str = "https://docs.google.com/spreadsheets/d/clinic123/edit?usp=sharing";

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn backend_with_records(rows: usize) -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.add_spreadsheet("clinic123", "Clinic");
        backend.add_worksheet_with_rows("clinic123", "Sheet1", vec![]);
        let data = (0..rows)
            .map(|i| strings(&[&format!("Patient {i}"), "40", "5.1", "120", "80", ""]))
            .collect();
        backend.add_worksheet_with_rows("clinic123", "Health Records", data);
        backend
    }

    #[tokio::test]
    async fn appends_after_existing_rows() {
        let backend = backend_with_records(3);
        let writer = SheetWriter::new(backend.clone());

        let values = strings(&["John Doe", "42", "6.0", "130", "85", "Fine"]);
        let outcome = writer.write_default(&values, SHEET).await;

        assert!(outcome.success, "{}", outcome.message);
        let written = outcome.written.unwrap();
        assert_eq!(written.row, 4);
        assert_eq!(written.range, "A4:F4");
        assert!(!written.fell_back);

        let rows = backend.rows("clinic123", "Health Records").unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], values);
        assert_eq!(rows[0][0], "Patient 0");
    }

    #[tokio::test]
    async fn long_input_is_truncated() {
        let backend = backend_with_records(0);
        let writer = SheetWriter::new(backend.clone());

        let values = strings(&["1", "2", "3", "4", "5", "6", "7", "8"]);
        assert!(writer.write_default(&values, SHEET).await.success);
        assert_eq!(
            backend.rows("clinic123", "Health Records").unwrap()[0],
            strings(&["1", "2", "3", "4", "5", "6"])
        );
    }

    #[tokio::test]
    async fn short_input_is_padded() {
        let backend = backend_with_records(1);
        let writer = SheetWriter::new(backend.clone());

        let outcome = writer.write_default(&strings(&["Ann", "30"]), SHEET).await;
        assert!(outcome.success);
        assert_eq!(
            backend.rows("clinic123", "Health Records").unwrap()[1],
            strings(&["Ann", "30", "", "", "", ""])
        );
    }

    #[tokio::test]
    async fn worksheet_match_ignores_case_and_whitespace() {
        let backend = backend_with_records(2);
        let writer = SheetWriter::new(backend.clone());

        let outcome = writer.write(&strings(&["x"]), SHEET, "  health RECORDS ").await;
        assert!(outcome.success);
        assert_eq!(outcome.written.unwrap().worksheet, "Health Records");
        assert_eq!(backend.worksheet_titles("clinic123").len(), 2);
    }

    #[tokio::test]
    async fn missing_worksheet_is_created() {
        let backend = MemoryBackend::new();
        backend.add_spreadsheet("clinic123", "Clinic");
        let writer = SheetWriter::new(backend.clone());

        let values = strings(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"]);
        let outcome = writer.write_default(&values, SHEET).await;

        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.written.as_ref().unwrap().row, 1);
        let ws = backend.worksheet("clinic123", "Health Records").unwrap();
        assert!(ws.row_count >= 1000);
        assert_eq!(ws.column_count, 12);
    }

    #[tokio::test]
    async fn permission_denied_falls_back_to_first_worksheet() {
        let backend = MemoryBackend::new();
        backend.add_spreadsheet("clinic123", "Clinic");
        backend.add_worksheet_with_rows("clinic123", "Sheet1", vec![strings(&["header"])]);
        backend.deny_worksheet_creation(true);
        let writer = SheetWriter::new(backend.clone());

        let outcome = writer.write_default(&strings(&["Ann"]), SHEET).await;

        assert!(outcome.success);
        assert!(outcome.message.contains("fallback"));
        let written = outcome.written.unwrap();
        assert!(written.fell_back);
        assert_eq!(written.worksheet, "Sheet1");
        assert_eq!(written.range, "A2:F2");
    }

    #[tokio::test]
    async fn fail_policy_refuses_fallback() {
        let backend = MemoryBackend::new();
        backend.add_spreadsheet("clinic123", "Clinic");
        backend.add_worksheet_with_rows("clinic123", "Sheet1", vec![]);
        backend.deny_worksheet_creation(true);
        let writer = SheetWriter::new(backend.clone()).with_policy(MissingWorksheetPolicy::Fail);

        let (ok, message) = writer.write_default(&strings(&["Ann"]), SHEET).await.into_pair();

        assert!(!ok);
        assert!(message.contains("Health Records"), "{message}");
        assert!(backend.rows("clinic123", "Sheet1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn denied_with_no_worksheets_fails() {
        let backend = MemoryBackend::new();
        backend.add_spreadsheet("clinic123", "Clinic");
        backend.deny_worksheet_creation(true);
        let writer = SheetWriter::new(backend);

        let outcome = writer.write_default(&strings(&["Ann"]), SHEET).await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("Permission denied"), "{}", outcome.message);
    }

    #[tokio::test]
    async fn unknown_spreadsheet_reports_failure() {
        let writer = SheetWriter::new(MemoryBackend::new());
        let (ok, message) = writer
            .write_default(&strings(&["Ann"]), "https://docs.google.com/spreadsheets/d/missing/edit")
            .await
            .into_pair();
        assert!(!ok);
        assert!(message.starts_with("Spreadsheet not found"), "{message}");
    }

    #[tokio::test]
    async fn bad_locator_reports_failure() {
        let writer = SheetWriter::new(MemoryBackend::new());
        let outcome = writer.write_default(&strings(&["Ann"]), "YOUR_GOOGLE_SHEET_URL HERE").await;
        assert!(!outcome.success);
        assert!(!outcome.message.is_empty());
        assert!(outcome.written.is_none());
    }

    #[tokio::test]
    async fn consecutive_writes_never_overwrite() {
        let backend = backend_with_records(0);
        let writer = SheetWriter::new(backend.clone());

        for name in ["A", "B", "C"] {
            assert!(writer.write_default(&strings(&[name]), SHEET).await.success);
        }
        let rows = backend.rows("clinic123", "Health Records").unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
