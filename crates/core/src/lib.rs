pub mod config;
pub mod field;
pub mod row;

pub use config::{AppConfig, ConfigError, MissingWorksheetPolicy, OcrSettings, SheetSettings};
pub use field::{FieldConfig, PixelRegion, RectError, RoiRect};
pub use row::{SheetRow, ROW_WIDTH};

/// Worksheet name used when the caller does not name one.
pub const DEFAULT_WORKSHEET: &str = "Health Records";
