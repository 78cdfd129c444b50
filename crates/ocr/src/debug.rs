use image::DynamicImage;
use std::path::{Path, PathBuf};

use crate::hash;

/// Optional sink that saves each field's crop for operator inspection.
///
/// Nothing here can fail an extraction: I/O errors are logged and dropped.
#[derive(Debug, Clone)]
pub struct DebugArtifacts {
    base: PathBuf,
}

/// Which step of the field pipeline a saved image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Crop,
    Binary,
}

impl Stage {
    fn prefix(self) -> &'static str {
        match self {
            Stage::Crop => "roi",
            Stage::Binary => "bin",
        }
    }
}

impl DebugArtifacts {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Per-image directory, keyed by a hash of the decoded pixels.
    pub fn dir_for(&self, image: &DynamicImage) -> PathBuf {
        let digest = hash::sha256_bytes(image.as_bytes());
        hash::artifact_dir(&self.base, &hash::to_hex(&digest))
    }

    pub fn save(&self, dir: &Path, field: &str, stage: Stage, img: &DynamicImage) {
        let path = dir.join(format!("{}_{}.png", stage.prefix(), file_safe(field)));
        let result = std::fs::create_dir_all(dir)
            .map_err(|e| e.to_string())
            .and_then(|()| img.save(&path).map_err(|e| e.to_string()));
        match result {
            Ok(()) => tracing::debug!(path = %path.display(), "saved debug crop"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not save debug crop"),
        }
    }
}

fn file_safe(field: &str) -> String {
    field
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
