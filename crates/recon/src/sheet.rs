//! In-memory worksheet model shared by the engine and the spreadsheet reader/writer.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Currency display format applied to `CellValue::Currency` cells.
pub const CURRENCY_FORMAT: &str = "\"$\"#,##0_-";

/// Date display format applied to `CellValue::Date` cells.
pub const DATE_FORMAT: &str = "yyyy/mm/dd";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    /// A number rendered with [`CURRENCY_FORMAT`].
    Currency(f64),
    Date(NaiveDate),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Blank means empty or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Native numeric value, without parsing text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) | Self::Currency(n) => Some(*n),
            _ => None,
        }
    }

    /// Display string used when a cell is read as a text field
    /// (invoice numbers stored as numbers, buyer names, remarks).
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) | Self::Currency(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Self::Date(d) => d.format("%Y/%m/%d").to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Presentation settings carried alongside the cell grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    /// Width applied to every written column without an explicit width.
    pub default_col_width: Option<f64>,
    /// Explicit column widths in Excel character units.
    pub col_widths: BTreeMap<usize, f64>,
    /// Columns whose cells wrap text.
    pub wrap_cols: Vec<usize>,
    /// Font applied to every written cell.
    pub font_name: Option<String>,
    /// AutoFilter range: (first_row, first_col, last_row, last_col)
    pub autofilter: Option<(usize, usize, usize, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<CellValue>>,
    /// Formula text by (row, col). The grid holds the cached result.
    formulas: BTreeMap<(usize, usize), String>,
    pub layout: SheetLayout,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            formulas: BTreeMap::new(),
            layout: SheetLayout::default(),
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
            formulas: BTreeMap::new(),
            layout: SheetLayout::default(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row in the sheet.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&[CellValue]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    /// Cell at (row, col); missing cells read as `Empty`.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Write a cell, growing the grid as needed.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let r = &mut self.rows[row];
        if r.len() <= col {
            r.resize(col + 1, CellValue::Empty);
        }
        r[col] = value;
        // A written value replaces any formula in the cell
        self.formulas.remove(&(row, col));
    }

    /// Attach formula text to a cell whose cached value is in the grid.
    pub fn set_formula(&mut self, row: usize, col: usize, formula: impl Into<String>) {
        self.formulas.insert((row, col), formula.into());
    }

    pub fn formula(&self, row: usize, col: usize) -> Option<&str> {
        self.formulas.get(&(row, col)).map(String::as_str)
    }

    /// Insert `count` empty columns before `at` in every row that reaches it.
    /// Formula cells move with their values; their text is not rewritten.
    pub fn insert_cols(&mut self, at: usize, count: usize) {
        for row in &mut self.rows {
            if row.len() > at {
                row.splice(at..at, std::iter::repeat(CellValue::Empty).take(count));
            }
        }
        self.formulas = std::mem::take(&mut self.formulas)
            .into_iter()
            .map(|((r, c), f)| if c >= at { ((r, c + count), f) } else { ((r, c), f) })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_cell_is_empty() {
        let sheet = Sheet::from_rows("s", vec![vec!["a".into()]]);
        assert_eq!(sheet.get(0, 0), &CellValue::text("a"));
        assert!(sheet.get(0, 5).is_empty());
        assert!(sheet.get(9, 0).is_empty());
    }

    #[test]
    fn set_grows_grid() {
        let mut sheet = Sheet::new("s");
        sheet.set(2, 3, CellValue::Number(1.0));
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.col_count(), 4);
        assert_eq!(sheet.get(2, 3).as_number(), Some(1.0));
    }

    #[test]
    fn insert_cols_shifts_right() {
        let mut sheet = Sheet::from_rows(
            "s",
            vec![
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                vec!["x".into()],
            ],
        );
        sheet.insert_cols(1, 2);
        assert_eq!(sheet.get(0, 0), &CellValue::text("a"));
        assert!(sheet.get(0, 1).is_empty());
        assert!(sheet.get(0, 2).is_empty());
        assert_eq!(sheet.get(0, 3), &CellValue::text("b"));
        assert_eq!(sheet.get(0, 5), &CellValue::text("d"));
        // Short rows are left alone
        assert_eq!(sheet.row(1).unwrap().len(), 1);
    }

    #[test]
    fn insert_cols_moves_formulas() {
        let mut sheet = Sheet::from_rows("s", vec![vec![1.0.into(), 2.0.into(), 3.0.into()]]);
        sheet.set_formula(0, 0, "SUM(B1:C1)");
        sheet.set_formula(0, 2, "B1+1");
        sheet.insert_cols(1, 3);
        assert_eq!(sheet.formula(0, 0), Some("SUM(B1:C1)"));
        assert_eq!(sheet.formula(0, 2), None);
        assert_eq!(sheet.formula(0, 5), Some("B1+1"));
        assert_eq!(sheet.get(0, 5).as_number(), Some(3.0));
    }

    #[test]
    fn set_replaces_formula() {
        let mut sheet = Sheet::from_rows("s", vec![vec![1.0.into(), 2.0.into()]]);
        sheet.set_formula(0, 1, "A1*2");
        sheet.set(0, 1, CellValue::text("是"));
        assert_eq!(sheet.formula(0, 1), None);
        assert_eq!(sheet.get(0, 1), &CellValue::text("是"));
    }

    #[test]
    fn display_integral_numbers_without_decimals() {
        assert_eq!(CellValue::Number(12345678.0).display(), "12345678");
        assert_eq!(CellValue::Number(1.5).display(), "1.5");
        assert_eq!(
            CellValue::Date(NaiveDate::from_ymd_opt(2021, 3, 5).unwrap()).display(),
            "2021/03/05"
        );
    }

    #[test]
    fn blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::text("   ").is_blank());
        assert!(!CellValue::text(" 1 ").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }
}
