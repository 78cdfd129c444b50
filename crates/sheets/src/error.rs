use thiserror::Error;

/// Failures reported by a [`crate::SheetsBackend`].
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Google API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected API response: {0}")]
    Decode(String),
    #[error("Invalid API base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl SheetsError {
    /// Map an HTTP status and Google's error message onto a variant.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            404 => SheetsError::NotFound(message),
            401 | 403 => SheetsError::PermissionDenied(message),
            429 => SheetsError::RateLimited(message),
            _ => SheetsError::Api { status, message },
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, SheetsError::PermissionDenied(_))
    }
}
