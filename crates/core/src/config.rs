use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::DEFAULT_WORKSHEET;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid field configuration{}: {source}", in_path(.path))]
    FieldJson {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

fn in_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

/// What to do when the target worksheet is missing and cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingWorksheetPolicy {
    /// Write into the first existing worksheet instead.
    #[default]
    FallbackToFirst,
    /// Report the failure.
    Fail,
}

impl std::str::FromStr for MissingWorksheetPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fallback_to_first" => Ok(Self::FallbackToFirst),
            "fail" => Ok(Self::Fail),
            other => Err(format!("Unknown worksheet policy: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Tesseract language code.
    pub language: String,
    /// Directory holding `*.traineddata`; `None` uses the engine default.
    pub tessdata: Option<PathBuf>,
    /// Fields restricted to the digits 0–9.
    pub numeric_fields: Vec<String>,
    /// Free-text fields whose paragraph breaks are kept.
    pub narrative_fields: Vec<String>,
    /// Where per-field crops are saved for inspection. Disabled when `None`.
    pub debug_dir: Option<PathBuf>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            tessdata: None,
            numeric_fields: vec!["systolic".into(), "diastolic".into()],
            narrative_fields: vec!["feedback".into()],
            debug_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    /// Spreadsheet URL or id.
    pub spreadsheet: Option<String>,
    pub worksheet: String,
    /// Field names written to columns A–F, in order.
    pub row_columns: Vec<String>,
    pub on_missing_worksheet: MissingWorksheetPolicy,
    pub api_base: String,
    /// Environment variable that holds the OAuth bearer token.
    pub token_env: String,
    pub timeout_secs: u64,
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            spreadsheet: None,
            worksheet: DEFAULT_WORKSHEET.to_string(),
            row_columns: ["name", "age", "blood_sugar", "systolic", "diastolic", "feedback"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            on_missing_worksheet: MissingWorksheetPolicy::default(),
            api_base: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            token_env: "GOOGLE_SHEETS_TOKEN".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Top-level `formscan.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub field_config: PathBuf,
    pub ocr: OcrSettings,
    pub sheets: SheetSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            field_config: PathBuf::from("field_config.json"),
            ocr: OcrSettings::default(),
            sheets: SheetSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file. Relative paths inside it are resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.field_config);
        if let Some(dir) = self.ocr.tessdata.as_mut() {
            resolve(dir);
        }
        if let Some(dir) = self.ocr.debug_dir.as_mut() {
            resolve(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheets.worksheet.trim().is_empty() {
            return Err(ConfigError::Invalid("sheets.worksheet must not be blank".into()));
        }
        if self.sheets.row_columns.is_empty() {
            return Err(ConfigError::Invalid("sheets.row_columns must name at least one field".into()));
        }
        if self.sheets.timeout_secs == 0 {
            return Err(ConfigError::Invalid("sheets.timeout_secs must be at least 1".into()));
        }
        if let Some(both) = self
            .ocr
            .numeric_fields
            .iter()
            .find(|f| self.ocr.narrative_fields.contains(*f))
        {
            return Err(ConfigError::Invalid(format!(
                "field '{both}' cannot be both numeric and narrative"
            )));
        }
        Ok(())
    }
}
