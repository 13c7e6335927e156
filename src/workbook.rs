//! Raw tabular input: sheets of rows of loosely typed cells.
//!
//! Spreadsheet decoding itself is left to a [`WorkbookParser`]; this module only
//! fixes the shape handed to the extractor and ships two simple parsers (JSON
//! workbooks and one-CSV-per-sheet directories).

use crate::error::{BillError, Result};
use crate::utils::safe_float;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Empty, or text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Display text of the cell, trimmed. Whole numbers print without a fraction.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            Cell::Number(n) if n.is_finite() => n.to_string(),
            Cell::Number(_) => String::new(),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Cell::Number(n) if n.is_finite() => *n,
            Cell::Number(_) | Cell::Empty => 0.0,
            Cell::Text(s) => safe_float(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// One sheet row. Accessors are bounds-checked: a column past the end of the row
/// reads as an empty cell, so short rows never fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SheetRow {
    pub cells: Vec<Cell>,
}

impl SheetRow {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, idx: usize) -> &Cell {
        self.cells.get(idx).unwrap_or(&EMPTY_CELL)
    }

    /// Trimmed text of column `idx`, `""` when absent.
    pub fn text(&self, idx: usize) -> String {
        self.cell(idx).text()
    }

    /// Numeric value of column `idx`, 0.0 when absent or not numeric.
    pub fn number(&self, idx: usize) -> f64 {
        self.cell(idx).as_f64()
    }
}

pub type Sheet = Vec<SheetRow>;

static EMPTY_CELL: Cell = Cell::Empty;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Workbook {
    pub sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>, rows: Sheet) -> Self {
        self.insert_sheet(name, rows);
        self
    }

    pub fn insert_sheet(&mut self, name: impl Into<String>, rows: Sheet) {
        self.sheets.insert(name.into(), rows);
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    /// Parses `{"Sheet name": [[cell, ...], ...], ...}` where cells are numbers,
    /// strings or `null`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Err(BillError::EmptyInput("workbook JSON is empty".to_string()));
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Loads every `*.csv` file in `dir` as one sheet named after the file stem.
    /// The first CSV line is read as data, like any other row.
    pub fn from_csv_dir(dir: &Path) -> Result<Self> {
        let mut workbook = Workbook::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if !is_csv {
                continue;
            }

            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let file = fs::File::open(&path)?;
            workbook.insert_sheet(stem, sheet_from_csv_reader(file)?);
        }

        if workbook.sheets.is_empty() {
            return Err(BillError::EmptyInput(format!(
                "no CSV sheets found in {}",
                dir.display()
            )));
        }

        Ok(workbook)
    }
}

/// Reads one CSV document into rows. Numeric-looking fields become numbers,
/// blank fields become empty cells, everything else stays text.
pub fn sheet_from_csv_reader<R: Read>(reader: R) -> Result<Sheet> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let cells = record.iter().map(csv_field_to_cell).collect();
        rows.push(SheetRow::new(cells));
    }

    Ok(rows)
}

fn csv_field_to_cell(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::Text(field.to_string()),
    }
}

/// Turns the raw bytes of one uploaded file into a [`Workbook`].
pub trait WorkbookParser {
    fn parse(&self, file_name: &str, bytes: &[u8]) -> Result<Workbook>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWorkbookParser;

impl WorkbookParser for JsonWorkbookParser {
    fn parse(&self, file_name: &str, bytes: &[u8]) -> Result<Workbook> {
        if bytes.is_empty() {
            return Err(BillError::EmptyInput(format!("{} has zero size", file_name)));
        }
        let text = std::str::from_utf8(bytes).map_err(|e| BillError::UnreadableWorkbook {
            name: file_name.to_string(),
            reason: e.to_string(),
        })?;
        Workbook::from_json_str(text).map_err(|e| match e {
            BillError::SerializationError(inner) => BillError::UnreadableWorkbook {
                name: file_name.to_string(),
                reason: inner.to_string(),
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_and_number() {
        assert_eq!(Cell::Number(1.0).text(), "1");
        assert_eq!(Cell::Number(2.5).text(), "2.5");
        assert_eq!(Cell::Text("  Item ".into()).text(), "Item");
        assert_eq!(Cell::Text("12.5".into()).as_f64(), 12.5);
        assert_eq!(Cell::Text("n/a".into()).as_f64(), 0.0);
        assert_eq!(Cell::Empty.as_f64(), 0.0);
    }

    #[test]
    fn test_blank_cells() {
        assert!(Cell::Empty.is_blank());
        assert!(Cell::Text(String::new()).is_blank());
        assert!(Cell::Text("  \t".into()).is_blank());
        assert!(!Cell::Text(" 1 ".into()).is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn test_row_accessors_default_past_end() {
        let row = SheetRow::new(vec![Cell::from("1"), Cell::from("Earthwork")]);
        assert_eq!(row.text(6), "");
        assert_eq!(row.number(3), 0.0);
        assert!(row.cell(10).is_empty());
    }

    #[test]
    fn test_workbook_from_json() {
        let json = r#"{
            "Title": [["Agreement No", "12/2024"]],
            "Work Order": [["Serial No", "Description"], [1, "Earthwork", "cum", 10, 5, null]]
        }"#;
        let wb = Workbook::from_json_str(json).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Title", "Work Order"]);
        let wo = wb.sheet("Work Order").unwrap();
        assert_eq!(wo[1].number(3), 10.0);
        assert!(wo[1].cell(5).is_empty());
    }

    #[test]
    fn test_empty_json_is_empty_input() {
        let err = Workbook::from_json_str("   ").unwrap_err();
        assert!(matches!(err, BillError::EmptyInput(_)));
    }

    #[test]
    fn test_json_parser_rejects_garbage() {
        let err = JsonWorkbookParser.parse("bill.json", b"not json").unwrap_err();
        assert!(matches!(err, BillError::UnreadableWorkbook { .. }));

        let err = JsonWorkbookParser.parse("bill.json", b"").unwrap_err();
        assert!(matches!(err, BillError::EmptyInput(_)));
    }

    #[test]
    fn test_sheet_from_csv_reader() {
        let data = "Serial No,Description,Unit,Qty\n1,Earthwork,cum,12\n,continued,,\n";
        let rows = sheet_from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].number(3), 12.0);
        assert!(rows[2].cell(0).is_empty());
        assert_eq!(rows[2].text(1), "continued");
    }
}
