use crate::error::{MatrixError, Result};
use crate::types::{LengthCategory, MatrixRow, MonthBucket, ResultMatrix};
use crate::util::format_number;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};
use tracing::info;

fn write_matrix_inner(path: &Path, matrix: &ResultMatrix) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(matrix.header_labels())?;
    for row in &matrix.rows {
        // `{}` on f64 is the shortest text that parses back to the same value.
        let record = std::iter::once(row.code.clone())
            .chain(row.quantities.iter().map(|q| q.to_string()));
        wtr.write_record(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export the matrix as CSV: a `code` + month label header, then one line
/// per row in matrix order.
pub fn write_matrix_csv<P: AsRef<Path>>(path: P, matrix: &ResultMatrix) -> Result<()> {
    let path = path.as_ref();
    write_matrix_inner(path, matrix)
        .map_err(|e| MatrixError::Export(format!("{}: {}", path.display(), e)))?;
    info!(path = %path.display(), rows = matrix.len(), "Exported matrix");
    Ok(())
}

fn write_xlsx_inner(path: &Path, matrix: &ResultMatrix) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    for (col, label) in matrix.header_labels().into_iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, label, &header)?;
    }
    for (idx, row) in matrix.rows.iter().enumerate() {
        let r = idx as u32 + 1;
        sheet.write_string(r, 0, row.code.as_str())?;
        for (col, q) in row.quantities.iter().enumerate() {
            sheet.write_number(r, col as u16 + 1, *q)?;
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Export the matrix as an `.xlsx` workbook with the same layout as the CSV
/// export.
pub fn write_matrix_xlsx<P: AsRef<Path>>(path: P, matrix: &ResultMatrix) -> Result<()> {
    let path = path.as_ref();
    write_xlsx_inner(path, matrix)
        .map_err(|e| MatrixError::Export(format!("{}: {}", path.display(), e)))?;
    info!(path = %path.display(), rows = matrix.len(), "Exported matrix workbook");
    Ok(())
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

/// Export by extension: `.xlsx` becomes a workbook, anything else CSV.
///
/// A CSV export is read back and must equal `matrix`.
pub fn write_matrix<P: AsRef<Path>>(path: P, matrix: &ResultMatrix) -> Result<()> {
    let path = path.as_ref();
    if is_xlsx(path) {
        return write_matrix_xlsx(path, matrix);
    }
    write_matrix_csv(path, matrix)?;
    let written = read_matrix_csv(path)?;
    if written != *matrix {
        return Err(MatrixError::Export(format!(
            "{}: file content does not match the table",
            path.display()
        )));
    }
    Ok(())
}

/// Read back a file written by [`write_matrix_csv`].
pub fn read_matrix_csv<P: AsRef<Path>>(path: P) -> Result<ResultMatrix> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let mut fields = headers.iter();
    match fields.next() {
        Some(first) if first.trim().eq_ignore_ascii_case("code") => {}
        _ => return Err(MatrixError::Import("first column must be `code`".into())),
    }
    let buckets = fields
        .map(|label| label.parse::<MonthBucket>().map_err(MatrixError::Import))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut cells = record.iter();
        let code = cells.next().unwrap_or("").to_string();
        let quantities = cells
            .map(|c| {
                c.parse::<f64>()
                    .map_err(|_| MatrixError::Import(format!("bad quantity {c:?} for {code}")))
            })
            .collect::<Result<Vec<f64>>>()?;
        if quantities.len() != buckets.len() {
            return Err(MatrixError::Import(format!(
                "row {code} has {} values, expected {}",
                quantities.len(),
                buckets.len()
            )));
        }
        rows.push(MatrixRow {
            category: LengthCategory::of(&code),
            code,
            quantities,
        });
    }
    Ok(ResultMatrix { buckets, rows })
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of the header plus the first `max_rows` rows.
pub fn render_preview(matrix: &ResultMatrix, max_rows: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record(matrix.header_labels());
    for row in matrix.rows.iter().take(max_rows) {
        builder.push_record(
            std::iter::once(row.code.clone())
                .chain(row.quantities.iter().map(|q| format_number(*q, 2))),
        );
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn preview_matrix(matrix: &ResultMatrix, max_rows: usize) {
    println!("{}", render_preview(matrix, max_rows));
    if matrix.is_empty() {
        println!("(no rows)\n");
    } else if matrix.len() > max_rows {
        println!("... {} more rows\n", matrix.len() - max_rows);
    } else {
        println!();
    }
}
