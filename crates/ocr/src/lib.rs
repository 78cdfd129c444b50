pub mod clean;
pub mod debug;
pub mod hash;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use clean::clean_extracted_text;
pub use debug::{DebugArtifacts, Stage};
pub use pipeline::{extract_fields, ExtractError, FieldExtractor};
pub use preprocess::{binarize, decode_image, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, OcrRequest, DIGITS};
pub use types::{DegradeReason, ExtractionReport, FieldKind, FieldOutcome};

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;
