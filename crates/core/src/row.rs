use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of spreadsheet columns a row occupies (A through F).
pub const ROW_WIDTH: usize = 6;

/// Six positional values destined for columns A–F.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow([String; ROW_WIDTH]);

impl SheetRow {
    /// Truncate or right-pad `values` to exactly six cells.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cells: [String; ROW_WIDTH] = Default::default();
        for (cell, value) in cells.iter_mut().zip(values) {
            *cell = value.into();
        }
        Self(cells)
    }

    /// Pick `columns` out of an extraction result, in order. Missing names become `""`.
    pub fn from_fields(fields: &BTreeMap<String, String>, columns: &[String]) -> Self {
        Self::from_values(
            columns
                .iter()
                .map(|c| fields.get(c).cloned().unwrap_or_default()),
        )
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into()
    }
}
