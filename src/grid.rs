use std::path::Path;

use calamine::Reader;

use crate::error::{MuniError, Result};

/// A loosely-typed spreadsheet cell, normalized at the reader boundary so
/// downstream parsing can match exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Cell content as trimmed text; numbers render without a forced decimal.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            CellValue::Number(n) => {
                if n.fract() == 0.0 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(format!("{n}"))
                }
            }
            CellValue::Empty => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse().ok(),
            CellValue::Empty => None,
        }
    }
}

/// One worksheet's used range as a dense grid. Rows and columns are 1-based
/// to match how spreadsheet layouts are described.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    pub name: String,
    rows: Vec<Vec<CellValue>>,
}

const EMPTY_CELL: CellValue = CellValue::Empty;

impl SheetGrid {
    pub fn new(name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        SheetGrid {
            name: name.to_string(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// 1-based cell access; anything beyond the used range reads as Empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        if row == 0 || col == 0 {
            return &EMPTY_CELL;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .unwrap_or(&EMPTY_CELL)
    }
}

fn from_calamine(data: &calamine::Data) -> CellValue {
    use calamine::Data;
    match data {
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Empty,
    }
}

fn load_xlsx(path: &Path) -> Result<Vec<SheetGrid>> {
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| MuniError::Spreadsheet(format!("failed to open workbook: {e}")))?;
    let names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| MuniError::Spreadsheet(format!("worksheet {name}: {e}")))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(from_calamine).collect())
            .collect();
        sheets.push(SheetGrid::new(&name, rows));
    }
    Ok(sheets)
}

fn load_csv(path: &Path) -> Result<Vec<SheetGrid>> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Vec<CellValue> = record
            .iter()
            .map(|field| {
                let t = field.trim();
                if t.is_empty() {
                    CellValue::Empty
                } else if let Ok(n) = t.parse::<f64>() {
                    CellValue::Number(n)
                } else {
                    CellValue::Text(field.to_string())
                }
            })
            .collect();
        rows.push(row);
    }
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1");
    Ok(vec![SheetGrid::new(name, rows)])
}

/// Load a budget workbook as cell grids, one per sheet. A `.csv` file loads
/// as a single sheet named after the file stem.
pub fn load_workbook(path: &Path) -> Result<Vec<SheetGrid>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => load_csv(path),
        Some(ext)
            if ext.eq_ignore_ascii_case("xlsx")
                || ext.eq_ignore_ascii_case("xls")
                || ext.eq_ignore_ascii_case("ods") =>
        {
            load_xlsx(path)
        }
        _ => Err(MuniError::UnsupportedFile(path.display().to_string())),
    }
}
