// src/table/mod.rs
pub mod header;
pub mod parse;
pub mod utils;

pub use header::locate_header;
pub use parse::{parse_delimited, parse_text};

/// A parsed delimited table, before any typing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names as the file claims them (trimmed, outer quotes stripped).
    pub headers: Vec<String>,
    /// Data rows. Rows may be shorter or longer than `headers`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Exact-name lookup, first match.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// First name from `candidates` that is a column of this table.
    pub fn resolve<'a>(&self, candidates: &'a [String]) -> Option<(&'a str, usize)> {
        candidates
            .iter()
            .find_map(|c| self.column_index(c).map(|i| (c.as_str(), i)))
    }

    /// The cell at `row`/`col`, or `None` when the row is short or the cell is blank.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Rows that carry at least one populated cell.
    pub fn usable_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.usable_rows() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        RawTable::new(
            vec!["Year".into(), "Jan".into(), "Feb".into()],
            vec![
                vec!["2020".into(), "1.0".into()],
                vec!["2021".into(), "".into(), "1.2".into(), "extra".into()],
            ],
        )
    }

    #[test]
    fn ragged_rows_read_as_missing() {
        let t = table();
        assert_eq!(t.cell(0, 2), None);
        assert_eq!(t.cell(1, 1), None);
        assert_eq!(t.cell(1, 2), Some("1.2"));
        assert_eq!(t.cell(5, 0), None);
    }

    #[test]
    fn resolve_is_first_match_wins() {
        let t = table();
        let cands = vec!["time".to_string(), "Feb".to_string(), "Year".to_string()];
        assert_eq!(t.resolve(&cands), Some(("Feb", 2)));
        assert_eq!(t.resolve(&["year".to_string()]), None);
    }
}
