use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    #[error("Spreadsheet locator is empty")]
    Empty,
    #[error("Not a spreadsheet URL or id: '{0}'")]
    Unrecognized(String),
}

fn re_url() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("invalid regex"))
}

fn re_bare_id() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\A[A-Za-z0-9_-]+\z").expect("invalid regex"))
}

/// The id part of a Google Sheets document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpreadsheetId(String);

impl SpreadsheetId {
    /// Accept a sharable URL (`…/spreadsheets/d/<id>/edit…`) or a bare id.
    pub fn parse(locator: &str) -> Result<Self, LocatorError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(LocatorError::Empty);
        }
        if let Some(caps) = re_url().captures(locator) {
            return Ok(Self(caps[1].to_string()));
        }
        if re_bare_id().is_match(locator) {
            return Ok(Self(locator.to_string()));
        }
        Err(LocatorError::Unrecognized(locator.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpreadsheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sharing_url() {
        let id = SpreadsheetId::parse(
            "https://docs.google.com/spreadsheets/d/1iHuQpPt-ue1_rHdQ/edit?usp=sharing",
        )
        .unwrap();
        assert_eq!(id.as_str(), "1iHuQpPt-ue1_rHdQ");
    }

    #[test]
    fn parses_bare_id() {
        assert_eq!(SpreadsheetId::parse("  abc_DEF-123 ").unwrap().to_string(), "abc_DEF-123");
    }

    #[test]
    fn rejects_other_input() {
        assert_eq!(SpreadsheetId::parse(""), Err(LocatorError::Empty));
        assert!(matches!(
            SpreadsheetId::parse("https://example.com/some/page"),
            Err(LocatorError::Unrecognized(_))
        ));
        assert!(matches!(
            SpreadsheetId::parse("YOUR SHEET URL"),
            Err(LocatorError::Unrecognized(_))
        ));
    }
}
