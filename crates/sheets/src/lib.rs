pub mod a1;
pub mod backend;
pub mod error;
pub mod google;
pub mod locator;
pub mod memory;
pub mod writer;

pub use a1::{column_letter, A1Range};
pub use backend::{SheetsBackend, Spreadsheet, Worksheet};
pub use error::SheetsError;
pub use google::GoogleSheetsClient;
pub use locator::{LocatorError, SpreadsheetId};
pub use memory::MemoryBackend;
pub use writer::{SheetWriter, WriteError, WriteOutcome, WrittenRow};
