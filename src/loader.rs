use crate::error::{MatrixError, Result};
use crate::types::RawTable;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub const DATE_FIELD: &str = "prod_date";
pub const CODE_FIELD: &str = "raw material";
pub const QUANTITY_FIELD: &str = "qty used";

const DATE_ALIASES: &[&str] = &[DATE_FIELD, "production_date", "prod date"];
const CODE_ALIASES: &[&str] = &[CODE_FIELD, "material_code", "raw_material"];
const QUANTITY_ALIASES: &[&str] = &[QUANTITY_FIELD, "quantity_used", "qty_used"];

/// Positions of the three logical fields within a [`RawTable`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub date: usize,
    pub code: usize,
    pub quantity: usize,
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let header = header.trim();
        aliases.iter().any(|a| header.eq_ignore_ascii_case(a))
    })
}

/// Locate the date, code and quantity columns; extra columns are ignored.
pub fn resolve_columns(headers: &[String]) -> Result<Columns> {
    let date = find_column(headers, DATE_ALIASES);
    let code = find_column(headers, CODE_ALIASES);
    let quantity = find_column(headers, QUANTITY_ALIASES);
    match (date, code, quantity) {
        (Some(date), Some(code), Some(quantity)) => Ok(Columns {
            date,
            code,
            quantity,
        }),
        _ => {
            let mut missing = Vec::new();
            if date.is_none() {
                missing.push(DATE_FIELD);
            }
            if code.is_none() {
                missing.push(CODE_FIELD);
            }
            if quantity.is_none() {
                missing.push(QUANTITY_FIELD);
            }
            Err(MatrixError::Schema { missing })
        }
    }
}

/// Read a whole CSV source into memory.
pub fn read_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    debug!(columns = headers.len(), rows = rows.len(), "Read CSV table");
    Ok(RawTable::new(headers, rows))
}

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| WORKBOOK_EXTENSIONS.iter().any(|w| e.eq_ignore_ascii_case(w)))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        // Date cells come back as serial numbers; render them as text the
        // date parser understands.
        Data::DateTime(v) => v
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(v) => v.to_string(),
        Data::DurationIso(v) => v.to_string(),
        Data::Error(v) => format!("{v:?}"),
        Data::Empty => String::new(),
    }
}

/// Read the first worksheet of a workbook into memory; its first row is
/// the header.
pub fn read_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(RawTable::default()),
    };
    let mut rows = range
        .rows()
        .map(|r| r.iter().map(cell_to_string).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = rows.collect();
    debug!(columns = headers.len(), rows = rows.len(), "Read first worksheet");
    Ok(RawTable::new(headers, rows))
}

/// Load a CSV file or spreadsheet and check that the required columns are
/// present. Spreadsheets are recognised by extension.
///
/// Fails with a schema error before returning anything when a column is
/// missing, so callers never hold a table the pipeline cannot use.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let table = if is_workbook(path) {
        read_workbook(path)?
    } else {
        read_table(std::fs::File::open(path)?)?
    };
    resolve_columns(&table.headers)?;
    info!(path = %path.display(), rows = table.len(), "Loaded source table");
    Ok(table)
}
