use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available; build with `tesseract` feature")]
    NotAvailable,
}

/// Character set used for purely numeric fields.
pub const DIGITS: &str = "0123456789";

/// Tesseract page segmentation mode 6: a single uniform block of text.
pub const PAGE_SEG_BLOCK: u8 = 6;

/// What the engine is asked to read for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrRequest<'a> {
    pub field: &'a str,
    /// Restrict recognition to these characters.
    pub char_whitelist: Option<&'a str>,
    pub page_seg_mode: u8,
}

impl<'a> OcrRequest<'a> {
    pub fn new(field: &'a str) -> Self {
        Self { field, char_whitelist: None, page_seg_mode: PAGE_SEG_BLOCK }
    }

    pub fn digits_only(mut self) -> Self {
        self.char_whitelist = Some(DIGITS);
        self
    }
}

/// Abstraction over an OCR backend.
/// Implementations accept PNG image bytes and return the recognized text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8], request: &OcrRequest<'_>) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image_bytes: &[u8], request: &OcrRequest<'_>) -> Result<String, OcrError> {
        (**self).recognize(image_bytes, request)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns preset text without looking at the image.
///
/// Honors `char_whitelist` by dropping other characters, which is close enough
/// to what a constrained engine reports for testing field handling.
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    pub text: String,
    per_field: HashMap<String, String>,
    failing: HashSet<String>,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    /// Return `text` for `field` instead of the default.
    pub fn with_field(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.per_field.insert(field.into(), text.into());
        self
    }

    /// Make recognition of `field` fail with an engine error.
    pub fn failing_on(mut self, field: impl Into<String>) -> Self {
        self.failing.insert(field.into());
        self
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8], request: &OcrRequest<'_>) -> Result<String, OcrError> {
        if self.failing.contains(request.field) {
            return Err(OcrError::Engine(format!("scripted failure for '{}'", request.field)));
        }
        let text = self.per_field.get(request.field).unwrap_or(&self.text);
        Ok(match request.char_whitelist {
            Some(allowed) => text
                .chars()
                .filter(|c| allowed.contains(*c) || c.is_whitespace())
                .collect(),
            None => text.clone(),
        })
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, OcrRequest};
    use leptess::{LepTess, Variable};

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8], request: &OcrRequest<'_>) -> Result<String, OcrError> {
            // LepTess is not Sync, so each field gets its own engine handle.
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, &request.page_seg_mode.to_string())
                .map_err(|e| OcrError::Engine(format!("{e:?}")))?;
            if let Some(allowed) = request.char_whitelist {
                lt.set_variable(Variable::TesseditCharWhitelist, allowed)
                    .map_err(|e| OcrError::Engine(format!("{e:?}")))?;
            }
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_text() {
        let r = MockRecognizer::new("Name: John Doe");
        assert_eq!(r.recognize(b"fake image data", &OcrRequest::new("name")).unwrap(), "Name: John Doe");
    }

    #[test]
    fn mock_per_field_override() {
        let r = MockRecognizer::new("default").with_field("age", "42");
        assert_eq!(r.recognize(b"", &OcrRequest::new("age")).unwrap(), "42");
        assert_eq!(r.recognize(b"", &OcrRequest::new("name")).unwrap(), "default");
    }

    #[test]
    fn mock_applies_whitelist() {
        let r = MockRecognizer::new("12O mmHg");
        let text = r.recognize(b"", &OcrRequest::new("systolic").digits_only()).unwrap();
        assert_eq!(text.trim(), "12");
    }

    #[test]
    fn mock_scripted_failure() {
        let r = MockRecognizer::new("x").failing_on("name");
        assert!(matches!(
            r.recognize(b"", &OcrRequest::new("name")),
            Err(OcrError::Engine(_))
        ));
        assert!(r.recognize(b"", &OcrRequest::new("age")).is_ok());
    }

    #[test]
    fn request_defaults() {
        let req = OcrRequest::new("name");
        assert_eq!(req.page_seg_mode, PAGE_SEG_BLOCK);
        assert!(req.char_whitelist.is_none());
        assert_eq!(OcrRequest::new("pulse").digits_only().char_whitelist, Some(DIGITS));
    }
}
