use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::a1::A1Range;
use crate::error::SheetsError;
use crate::locator::SpreadsheetId;

/// A tab inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worksheet {
    pub sheet_id: i64,
    pub title: String,
    pub index: u32,
    pub row_count: u32,
    pub column_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
    /// In tab order.
    pub worksheets: Vec<Worksheet>,
}

impl Spreadsheet {
    /// Case-insensitive, whitespace-trimmed title lookup.
    pub fn find_worksheet(&self, name: &str) -> Option<&Worksheet> {
        let wanted = name.trim().to_lowercase();
        self.worksheets
            .iter()
            .find(|w| w.title.trim().to_lowercase() == wanted)
    }
}

/// The operations the writer needs from a spreadsheet service.
///
/// One implementation talks to Google over HTTP; [`crate::MemoryBackend`]
/// keeps everything in process.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    async fn open(&self, id: &SpreadsheetId) -> Result<Spreadsheet, SheetsError>;

    async fn add_worksheet(
        &self,
        id: &SpreadsheetId,
        title: &str,
        rows: u32,
        columns: u32,
    ) -> Result<Worksheet, SheetsError>;

    /// Every row of the worksheet's used range; trailing empty rows omitted.
    async fn get_all_values(
        &self,
        id: &SpreadsheetId,
        worksheet: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Write `rows` into `range`. Cells are parsed as if typed into the UI,
    /// so numbers, dates and formulas are recognised.
    async fn update_values(
        &self,
        id: &SpreadsheetId,
        range: &A1Range,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsError>;
}
