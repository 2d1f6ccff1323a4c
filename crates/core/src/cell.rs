use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single source-grid value. The reader performs format-specific coercion
/// exactly once; everything downstream pattern-matches on the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render the cell for the prepared-text form. Numbers print without a
    /// forced decimal tail so `50.0` serializes as `50`.
    pub fn display_text(&self) -> String {
        match self {
            Cell::Number(n) => format!("{n}"),
            Cell::Text(s) => s.clone(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// Ordered rows of ordered cells, immutable once read.
#[derive(Debug, Clone, Default)]
pub struct RawGrid {
    pub rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<&[Cell]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// True when no row carries a single non-empty cell.
    pub fn has_no_content(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(Cell::is_empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_detection() {
        assert!(Cell::Empty.is_empty());
        assert!(Cell::Text("   ".into()).is_empty());
        assert!(!Cell::Text("x".into()).is_empty());
        assert!(!Cell::Number(0.0).is_empty());
    }

    #[test]
    fn display_text_trims_float_tail() {
        assert_eq!(Cell::Number(50.0).display_text(), "50");
        assert_eq!(Cell::Number(12.34).display_text(), "12.34");
    }

    #[test]
    fn display_text_date_is_iso() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(Cell::Date(d).display_text(), "2024-01-15");
    }

    #[test]
    fn grid_content_check() {
        let empty = RawGrid::new(vec![vec![Cell::Empty, Cell::Text(" ".into())]]);
        assert!(empty.has_no_content());

        let grid = RawGrid::new(vec![vec![Cell::Empty, Cell::Number(1.0)]]);
        assert!(!grid.has_no_content());
    }

    #[test]
    fn grid_cell_lookup() {
        let grid = RawGrid::new(vec![vec![Cell::Text("a".into()), Cell::Number(2.0)]]);
        assert_eq!(grid.cell(0, 1), Some(&Cell::Number(2.0)));
        assert_eq!(grid.cell(1, 0), None);
        assert_eq!(grid.cell(0, 9), None);
    }
}
