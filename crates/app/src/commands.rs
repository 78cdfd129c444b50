use anyhow::{Context, Result};
use formscan_core::{AppConfig, FieldConfig, RectError, SheetRow, SheetSettings};
use formscan_ocr::{FieldExtractor, FieldOutcome, OcrBackend};
use formscan_sheets::GoogleSheetsClient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "formscan.toml";

/// JSON printed by `formscan extract` and accepted back by `append --from-json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub image: PathBuf,
    pub values: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldOutcome>,
}

/// Row data accepted by `append --from-json`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RowInput {
    /// `["John Doe", "42", ...]`, already in column order.
    Positional(Vec<String>),
    /// `extract` output, possibly edited by hand.
    Extraction { values: BTreeMap<String, String> },
    /// `{"name": "John Doe", "age": "42", ...}`
    Fields(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCheck {
    pub field: String,
    pub problem: Option<String>,
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                return AppConfig::load(default).context("Failed to load formscan.toml");
            }
            info!("no {DEFAULT_CONFIG_FILE} found, using built-in defaults");
            Ok(AppConfig::default())
        }
    }
}

pub fn load_fields(config: &AppConfig) -> Result<FieldConfig> {
    let fields = FieldConfig::load(&config.field_config).with_context(|| {
        format!("Failed to load field configuration from {}", config.field_config.display())
    })?;
    if fields.is_empty() {
        warn!(path = %config.field_config.display(), "field configuration has no fields");
    }
    Ok(fields)
}

#[cfg(feature = "tesseract")]
pub fn build_recognizer(config: &AppConfig) -> Result<Box<dyn OcrBackend>> {
    let data_path = config.ocr.tessdata.as_ref().map(|p| p.display().to_string());
    Ok(Box::new(formscan_ocr::TesseractRecognizer::new(data_path, &config.ocr.language)))
}

#[cfg(not(feature = "tesseract"))]
pub fn build_recognizer(_config: &AppConfig) -> Result<Box<dyn OcrBackend>> {
    Err(formscan_ocr::OcrError::NotAvailable.into())
}

pub fn run_extract<R: OcrBackend>(
    extractor: &FieldExtractor<R>,
    fields: &FieldConfig,
    image: &Path,
) -> Result<ExtractionOutput> {
    let report = extractor
        .extract_file(image, fields)
        .with_context(|| format!("Failed to read form image {}", image.display()))?;

    for (field, cause) in report.degraded() {
        warn!(field, %cause, "field left empty");
    }
    info!(
        fields = report.fields.len(),
        degraded = report.degraded().count(),
        "extraction finished"
    );

    Ok(ExtractionOutput {
        image: image.to_path_buf(),
        values: report.values(),
        fields: report.fields,
    })
}

/// Pretty JSON to `output`, or stdout when no file is given.
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

pub fn read_row_file(path: &Path) -> Result<RowInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "{} must hold an extraction result, a field object or an array of strings",
            path.display()
        )
    })
}

/// Order the input by `columns`; positional input is taken as-is.
pub fn row_values(input: RowInput, columns: &[String]) -> Vec<String> {
    match input {
        RowInput::Positional(values) => values,
        RowInput::Extraction { values } | RowInput::Fields(values) => {
            SheetRow::from_fields(&values, columns).into_vec()
        }
    }
}

/// Client for the Sheets API, authenticated with the token in `settings.token_env`.
pub fn sheets_client(settings: &SheetSettings) -> Result<GoogleSheetsClient> {
    let token = std::env::var(&settings.token_env).with_context(|| {
        format!("Set {} to an OAuth access token for the Sheets API", settings.token_env)
    })?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;
    GoogleSheetsClient::new(http, token)
        .with_base_url(&settings.api_base)
        .context("Invalid sheets.api_base")
}

/// Report fields whose rectangle can never yield text.
pub fn check_fields(fields: &FieldConfig) -> Vec<FieldCheck> {
    fields
        .iter()
        .map(|(name, rect)| {
            let problem = match rect {
                Err(e) => Some(e.to_string()),
                Ok(r) if r.width < 0 || r.height < 0 => Some(
                    RectError::NegativeSize { width: r.width, height: r.height }.to_string(),
                ),
                Ok(r) if r.width == 0 || r.height == 0 => Some("Rectangle has no area".to_string()),
                Ok(_) => None,
            };
            FieldCheck { field: name.to_string(), problem }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use formscan_core::{MissingWorksheetPolicy, RoiRect};
    use formscan_ocr::MockRecognizer;
    use formscan_sheets::{MemoryBackend, SheetWriter};
    use image::{DynamicImage, Rgb, RgbImage};

    fn columns() -> Vec<String> {
        SheetSettings::default().row_columns
    }

    #[test]
    fn positional_json_is_kept_in_order() {
        let input: RowInput = serde_json::from_str(r#"["John", "42", "6.1"]"#).unwrap();
        assert_eq!(row_values(input, &columns()), vec!["John", "42", "6.1"]);
    }

    #[test]
    fn field_object_is_ordered_by_columns() {
        let input: RowInput = serde_json::from_str(
            r#"{"feedback": "ok", "name": "John", "systolic": "120", "extra": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(
            row_values(input, &columns()),
            vec!["John", "", "", "120", "", "ok"]
        );
    }

    #[test]
    fn extraction_output_round_trips_into_a_row() {
        let json = r#"{
            "image": "form.png",
            "values": {"name": "Ann", "age": "30", "blood_sugar": "", "systolic": "118",
                       "diastolic": "76", "feedback": "Fine"},
            "fields": {}
        }"#;
        let input: RowInput = serde_json::from_str(json).unwrap();
        assert!(matches!(input, RowInput::Extraction { .. }));
        assert_eq!(
            row_values(input, &columns()),
            vec!["Ann", "30", "", "118", "76", "Fine"]
        );
    }

    #[test]
    fn unreadable_row_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("row.json");
        std::fs::write(&path, "42").unwrap();
        let err = read_row_file(&path).unwrap_err();
        assert!(err.to_string().contains("must hold an extraction result"));
    }

    #[test]
    fn check_reports_bad_rectangles_only() {
        let mut fields = FieldConfig::from_rects([
            ("name", RoiRect::new(10, 10, 100, 20)),
            ("age", RoiRect::new(0, 0, -5, 10)),
            ("feedback", RoiRect::new(0, 0, 0, 10)),
        ]);
        fields.insert_raw("systolic", serde_json::json!({"x": 1, "y": 2}));

        let checks = check_fields(&fields);
        let problems: BTreeMap<_, _> = checks
            .iter()
            .map(|c| (c.field.as_str(), c.problem.is_some()))
            .collect();
        assert_eq!(
            problems,
            BTreeMap::from([("age", true), ("feedback", true), ("name", false), ("systolic", true)])
        );
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/formscan.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/formscan.toml"));
    }

    #[test]
    fn config_points_at_field_file_next_to_it() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("formscan.toml"), "field_config = \"fields.json\"\n").unwrap();
        std::fs::write(
            dir.path().join("fields.json"),
            r#"{"name": {"x": 0, "y": 0, "width": 10, "height": 10}}"#,
        )
        .unwrap();

        let config = load_config(Some(&dir.path().join("formscan.toml"))).unwrap();
        let fields = load_fields(&config).unwrap();
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["name"]);
    }

    #[tokio::test]
    async fn extracted_form_lands_in_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("form.png");
        DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([255, 255, 255])))
            .save(&image)
            .unwrap();

        let fields = FieldConfig::from_rects([
            ("name", RoiRect::new(0, 0, 100, 20)),
            ("systolic", RoiRect::new(0, 30, 50, 20)),
            ("age", RoiRect::new(500, 500, 10, 10)),
        ]);
        let recognizer = MockRecognizer::new("")
            .with_field("name", "Name: John Doe")
            .with_field("systolic", "12O/ 120");
        let extractor = FieldExtractor::new(recognizer);

        let output = run_extract(&extractor, &fields, &image).unwrap();
        assert_eq!(output.values["name"], "John Doe");
        assert_eq!(output.values["age"], "");
        assert!(output.fields["age"].is_degraded());

        let backend = MemoryBackend::new();
        backend.add_spreadsheet("abc", "Clinic");
        backend.add_worksheet_with_rows("abc", "Health Records", vec![vec!["header".into()]]);
        let writer = SheetWriter::new(backend.clone()).with_policy(MissingWorksheetPolicy::Fail);

        let values = row_values(RowInput::Extraction { values: output.values }, &columns());
        let outcome = writer.write(&values, "abc", "Health Records").await;
        assert!(outcome.success, "{}", outcome.message);

        let rows = backend.rows("abc", "Health Records").unwrap();
        assert_eq!(rows[1][0], "John Doe");
        assert_eq!(rows[1][1], "");
    }

    #[test]
    fn missing_image_is_an_error() {
        let extractor = FieldExtractor::new(MockRecognizer::new("x"));
        let fields = FieldConfig::from_rects([("name", RoiRect::new(0, 0, 10, 10))]);
        assert!(run_extract(&extractor, &fields, Path::new("/nonexistent/form.png")).is_err());
    }
}
