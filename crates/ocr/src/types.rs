use formscan_core::RectError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a field's OCR output is constrained and cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line free text; whitespace collapsed.
    Text,
    /// Digits only (e.g. blood pressure readings).
    Numeric,
    /// Multi-line prose; paragraph breaks kept.
    Narrative,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Text => write!(f, "text"),
            FieldKind::Numeric => write!(f, "numeric"),
            FieldKind::Narrative => write!(f, "narrative"),
        }
    }
}

/// Why a field came back empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DegradeReason {
    MalformedRect(String),
    NegativeSize,
    EmptyRegion,
    Preprocess(String),
    Ocr(String),
}

impl From<RectError> for DegradeReason {
    fn from(e: RectError) -> Self {
        match e {
            RectError::Malformed(msg) => DegradeReason::MalformedRect(msg),
            RectError::NegativeSize { .. } => DegradeReason::NegativeSize,
            RectError::EmptyRegion { .. } => DegradeReason::EmptyRegion,
        }
    }
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::MalformedRect(msg) => write!(f, "malformed rectangle: {msg}"),
            DegradeReason::NegativeSize => write!(f, "negative rectangle size"),
            DegradeReason::EmptyRegion => write!(f, "rectangle lies outside the image"),
            DegradeReason::Preprocess(msg) => write!(f, "preprocessing failed: {msg}"),
            DegradeReason::Ocr(msg) => write!(f, "OCR failed: {msg}"),
        }
    }
}

/// Per-field result. A degraded field still reads as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome {
    Extracted { value: String },
    Degraded { cause: DegradeReason },
}

impl FieldOutcome {
    pub fn extracted(value: impl Into<String>) -> Self {
        FieldOutcome::Extracted { value: value.into() }
    }

    pub fn degraded(cause: impl Into<DegradeReason>) -> Self {
        FieldOutcome::Degraded { cause: cause.into() }
    }

    pub fn value(&self) -> &str {
        match self {
            FieldOutcome::Extracted { value } => value,
            FieldOutcome::Degraded { .. } => "",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, FieldOutcome::Degraded { .. })
    }
}

/// Outcome of one extraction run, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub fields: BTreeMap<String, FieldOutcome>,
}

impl ExtractionReport {
    /// Flatten to `field name -> text`, degraded fields as `""`.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(name, outcome)| (name.clone(), outcome.value().to_string()))
            .collect()
    }

    pub fn get(&self, field: &str) -> Option<&FieldOutcome> {
        self.fields.get(field)
    }

    pub fn degraded(&self) -> impl Iterator<Item = (&str, &DegradeReason)> {
        self.fields.iter().filter_map(|(name, outcome)| match outcome {
            FieldOutcome::Degraded { cause } => Some((name.as_str(), cause)),
            FieldOutcome::Extracted { .. } => None,
        })
    }
}
