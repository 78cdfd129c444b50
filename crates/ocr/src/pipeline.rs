use formscan_core::{FieldConfig, OcrSettings};
use image::DynamicImage;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clean::clean_extracted_text;
use crate::debug::{DebugArtifacts, Stage};
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrRequest};
use crate::types::{DegradeReason, ExtractionReport, FieldKind, FieldOutcome};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] PreprocessError),
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Crop → binarize → OCR → clean, once per configured field.
///
/// Holds no per-run state, so the same image and configuration always give
/// the same report.
pub struct FieldExtractor<R: OcrBackend> {
    recognizer: R,
    numeric: HashSet<String>,
    narrative: HashSet<String>,
    debug: Option<DebugArtifacts>,
}

impl<R: OcrBackend> FieldExtractor<R> {
    /// Extractor with the default numeric (`systolic`, `diastolic`) and
    /// narrative (`feedback`) fields.
    pub fn new(recognizer: R) -> Self {
        Self::from_settings(recognizer, &OcrSettings::default())
    }

    pub fn from_settings(recognizer: R, settings: &OcrSettings) -> Self {
        Self {
            recognizer,
            numeric: settings.numeric_fields.iter().cloned().collect(),
            narrative: settings.narrative_fields.iter().cloned().collect(),
            debug: settings.debug_dir.as_ref().map(DebugArtifacts::new),
        }
    }

    pub fn with_debug_artifacts(mut self, sink: DebugArtifacts) -> Self {
        self.debug = Some(sink);
        self
    }

    pub fn kind_of(&self, field: &str) -> FieldKind {
        if self.numeric.contains(field) {
            FieldKind::Numeric
        } else if self.narrative.contains(field) {
            FieldKind::Narrative
        } else {
            FieldKind::Text
        }
    }

    /// Decode `data` first; an undecodable upload fails before any field runs.
    pub fn extract_from_bytes(
        &self,
        data: &[u8],
        config: &FieldConfig,
    ) -> Result<ExtractionReport, ExtractError> {
        let image = preprocess::decode_image(data)?;
        self.extract(&image, config)
    }

    /// Read a form image from disk and extract it.
    pub fn extract_file(&self, path: &Path, config: &FieldConfig) -> Result<ExtractionReport, ExtractError> {
        let image = image::open(path).map_err(PreprocessError::from)?;
        self.extract(&image, config)
    }

    /// Extract every configured field. Only an image without pixels is an
    /// error; everything else degrades the affected field to `""`.
    pub fn extract(
        &self,
        image: &DynamicImage,
        config: &FieldConfig,
    ) -> Result<ExtractionReport, ExtractError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(ExtractError::EmptyImage { width, height });
        }

        let debug_dir = self.debug.as_ref().map(|sink| (sink, sink.dir_for(image)));

        let mut report = ExtractionReport::default();
        for (field, rect) in config.iter() {
            let outcome = match rect.and_then(|r| r.clamp_to(width, height)) {
                Err(e) => FieldOutcome::degraded(e),
                Ok(region) => {
                    let roi = preprocess::crop(image, region);
                    if let Some((sink, dir)) = &debug_dir {
                        sink.save(dir, field, Stage::Crop, &roi);
                    }
                    match self.read_roi(&roi, field, debug_dir.as_ref()) {
                        Ok(raw) => {
                            FieldOutcome::extracted(clean_extracted_text(&raw, field, self.kind_of(field)))
                        }
                        Err(cause) => FieldOutcome::degraded(cause),
                    }
                }
            };

            match &outcome {
                FieldOutcome::Extracted { value } => debug!(field, chars = value.len(), "field extracted"),
                FieldOutcome::Degraded { cause } => warn!(field, %cause, "field degraded to empty"),
            }
            report.fields.insert(field.to_string(), outcome);
        }

        Ok(report)
    }

    /// Binarize a cropped region and run OCR on it, returning the raw text.
    pub fn extract_text_from_roi(&self, roi: &DynamicImage, field: &str) -> Result<String, DegradeReason> {
        self.read_roi(roi, field, None)
    }

    fn read_roi(
        &self,
        roi: &DynamicImage,
        field: &str,
        debug: Option<&(&DebugArtifacts, std::path::PathBuf)>,
    ) -> Result<String, DegradeReason> {
        if roi.width() == 0 || roi.height() == 0 {
            return Err(DegradeReason::EmptyRegion);
        }

        let binary = preprocess::binarize(roi).map_err(|e| DegradeReason::Preprocess(e.to_string()))?;
        if let Some((sink, dir)) = debug {
            sink.save(dir, field, Stage::Binary, &DynamicImage::ImageLuma8(binary.clone()));
        }
        let png = preprocess::encode_png(&binary).map_err(|e| DegradeReason::Preprocess(e.to_string()))?;

        let mut request = OcrRequest::new(field);
        if self.kind_of(field) == FieldKind::Numeric {
            request = request.digits_only();
        }

        self.recognizer
            .recognize(&png, &request)
            .map(|text| text.trim().to_string())
            .map_err(|e| DegradeReason::Ocr(e.to_string()))
    }
}

/// One-shot form of [`FieldExtractor::extract`] returning plain strings.
pub fn extract_fields<R: OcrBackend>(
    recognizer: R,
    image: &DynamicImage,
    config: &FieldConfig,
) -> Result<BTreeMap<String, String>, ExtractError> {
    FieldExtractor::new(recognizer)
        .extract(image, config)
        .map(|report| report.values())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
