use std::fmt;

/// Spreadsheet column name for a 1-based index: 1 → `A`, 26 → `Z`, 27 → `AA`.
pub fn column_letter(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = ((index - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quote a worksheet title for A1 notation, doubling embedded quotes.
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// A single-row block of cells on one worksheet, e.g. `'Health Records'!A4:F4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub worksheet: String,
    /// 1-based row.
    pub row: u32,
    /// 1-based first column.
    pub first_column: u32,
    pub width: u32,
}

impl A1Range {
    /// `width` cells starting at column A of `row`.
    pub fn row_from_a(worksheet: impl Into<String>, row: u32, width: u32) -> Self {
        Self { worksheet: worksheet.into(), row, first_column: 1, width: width.max(1) }
    }

    pub fn last_column(&self) -> u32 {
        self.first_column + self.width - 1
    }

    /// The cell part without the worksheet, e.g. `A4:F4`.
    pub fn cells(&self) -> String {
        format!(
            "{}{row}:{}{row}",
            column_letter(self.first_column),
            column_letter(self.last_column()),
            row = self.row
        )
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_title(&self.worksheet), self.cells())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(6), "F");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(702), "ZZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn six_column_row() {
        let r = A1Range::row_from_a("Health Records", 4, 6);
        assert_eq!(r.cells(), "A4:F4");
        assert_eq!(r.to_string(), "'Health Records'!A4:F4");
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote_title("Bob's"), "'Bob''s'");
    }
}
