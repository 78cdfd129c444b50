use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::a1::A1Range;
use crate::backend::{SheetsBackend, Spreadsheet, Worksheet};
use crate::error::SheetsError;
use crate::locator::SpreadsheetId;

#[derive(Debug)]
struct Tab {
    meta: Worksheet,
    cells: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct Book {
    title: String,
    tabs: Vec<Tab>,
}

#[derive(Debug, Default)]
struct State {
    books: HashMap<String, Book>,
    deny_create: bool,
    next_sheet_id: i64,
}

/// In-process spreadsheet store with the same semantics the writer relies on.
///
/// Clones share state, so a test can keep a handle and inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_spreadsheet(&self, id: &str, title: &str) {
        self.state().books.insert(
            id.to_string(),
            Book { title: title.to_string(), tabs: Vec::new() },
        );
    }

    /// Add a worksheet holding `rows`. The spreadsheet must already exist.
    pub fn add_worksheet_with_rows(&self, id: &str, title: &str, rows: Vec<Vec<String>>) {
        let mut state = self.state();
        let sheet_id = state.next_sheet_id;
        state.next_sheet_id += 1;
        if let Some(book) = state.books.get_mut(id) {
            let index = book.tabs.len() as u32;
            book.tabs.push(Tab {
                meta: Worksheet {
                    sheet_id,
                    title: title.to_string(),
                    index,
                    row_count: 1000,
                    column_count: 26,
                },
                cells: rows,
            });
        }
    }

    /// Make `add_worksheet` fail with a permission error, as a read-only share does.
    pub fn deny_worksheet_creation(&self, deny: bool) {
        self.state().deny_create = deny;
    }

    pub fn worksheet_titles(&self, id: &str) -> Vec<String> {
        self.state()
            .books
            .get(id)
            .map(|b| b.tabs.iter().map(|t| t.meta.title.clone()).collect())
            .unwrap_or_default()
    }

    pub fn worksheet(&self, id: &str, title: &str) -> Option<Worksheet> {
        self.state()
            .books
            .get(id)?
            .tabs
            .iter()
            .find(|t| t.meta.title == title)
            .map(|t| t.meta.clone())
    }

    /// Raw cell grid of a worksheet, exactly as stored.
    pub fn rows(&self, id: &str, title: &str) -> Option<Vec<Vec<String>>> {
        self.state()
            .books
            .get(id)?
            .tabs
            .iter()
            .find(|t| t.meta.title == title)
            .map(|t| t.cells.clone())
    }
}

fn not_found(id: &SpreadsheetId) -> SheetsError {
    SheetsError::NotFound(format!("Requested entity was not found: spreadsheet '{id}'"))
}

fn unknown_range(title: &str) -> SheetsError {
    SheetsError::Api { status: 400, message: format!("Unable to parse range: '{title}'") }
}

#[async_trait]
impl SheetsBackend for MemoryBackend {
    async fn open(&self, id: &SpreadsheetId) -> Result<Spreadsheet, SheetsError> {
        let state = self.state();
        let book = state.books.get(id.as_str()).ok_or_else(|| not_found(id))?;
        Ok(Spreadsheet {
            id: id.to_string(),
            title: book.title.clone(),
            worksheets: book.tabs.iter().map(|t| t.meta.clone()).collect(),
        })
    }

    async fn add_worksheet(
        &self,
        id: &SpreadsheetId,
        title: &str,
        rows: u32,
        columns: u32,
    ) -> Result<Worksheet, SheetsError> {
        let mut state = self.state();
        if state.deny_create {
            return Err(SheetsError::PermissionDenied(
                "The caller does not have permission".to_string(),
            ));
        }
        let sheet_id = state.next_sheet_id;
        state.next_sheet_id += 1;

        let book = state.books.get_mut(id.as_str()).ok_or_else(|| not_found(id))?;
        if book.tabs.iter().any(|t| t.meta.title.eq_ignore_ascii_case(title)) {
            return Err(SheetsError::Api {
                status: 400,
                message: format!("A sheet with the name \"{title}\" already exists."),
            });
        }
        let meta = Worksheet {
            sheet_id,
            title: title.to_string(),
            index: book.tabs.len() as u32,
            row_count: rows,
            column_count: columns,
        };
        book.tabs.push(Tab { meta: meta.clone(), cells: Vec::new() });
        Ok(meta)
    }

    async fn get_all_values(
        &self,
        id: &SpreadsheetId,
        worksheet: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let state = self.state();
        let book = state.books.get(id.as_str()).ok_or_else(|| not_found(id))?;
        let tab = book
            .tabs
            .iter()
            .find(|t| t.meta.title == worksheet)
            .ok_or_else(|| unknown_range(worksheet))?;

        // Like the API: trailing empty cells and rows are not returned.
        let mut rows: Vec<Vec<String>> = tab
            .cells
            .iter()
            .map(|row| {
                let used = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
                row[..used].to_vec()
            })
            .collect();
        while rows.last().is_some_and(Vec::is_empty) {
            rows.pop();
        }
        Ok(rows)
    }

    async fn update_values(
        &self,
        id: &SpreadsheetId,
        range: &A1Range,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsError> {
        let mut state = self.state();
        let book = state.books.get_mut(id.as_str()).ok_or_else(|| not_found(id))?;
        let tab = book
            .tabs
            .iter_mut()
            .find(|t| t.meta.title == range.worksheet)
            .ok_or_else(|| unknown_range(&range.worksheet))?;

        let first_col = (range.first_column - 1) as usize;
        for (offset, values) in rows.iter().enumerate() {
            let r = (range.row - 1) as usize + offset;
            if tab.cells.len() <= r {
                tab.cells.resize_with(r + 1, Vec::new);
            }
            let row = &mut tab.cells[r];
            let width = values.len().min(range.width as usize);
            if row.len() < first_col + width {
                row.resize(first_col + width, String::new());
            }
            row[first_col..first_col + width].clone_from_slice(&values[..width]);
        }
        Ok(())
    }
}
