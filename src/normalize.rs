// Record normalization: schema check, date/window filter, quantity and
// code cleanup, optional code search.
use crate::error::Result;
use crate::loader::resolve_columns;
use crate::types::{MonthBucket, NormalizeReport, NormalizedRecord, RawTable, Window};
use crate::util::{parse_date_safe, parse_quantity};
use tracing::{debug, trace};

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Clean raw rows into normalized records, preserving input order.
///
/// Rows with unparseable dates, dates outside `window`, or empty codes are
/// dropped. An unparseable quantity becomes 0 and the row is kept. When
/// `search` is non-empty only codes containing it (case-insensitively)
/// survive.
pub fn normalize(
    table: &RawTable,
    window: Window,
    search: Option<&str>,
) -> Result<(Vec<NormalizedRecord>, NormalizeReport)> {
    let cols = resolve_columns(&table.headers)?;
    let needle = search
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty());

    let mut report = NormalizeReport {
        total_rows: table.len(),
        ..Default::default()
    };
    let mut out = Vec::new();

    for (idx, row) in table.rows.iter().enumerate() {
        let Some(date) = parse_date_safe(cell(row, cols.date)) else {
            trace!(row = idx, "Dropping row with unparseable date");
            report.bad_dates += 1;
            continue;
        };
        let bucket = MonthBucket::from_date(&date);
        if !window.contains(bucket) {
            report.outside_window += 1;
            continue;
        }

        let quantity = match parse_quantity(cell(row, cols.quantity)) {
            Some(q) => q,
            None => {
                trace!(row = idx, "Quantity not numeric, using 0");
                report.coerced_quantities += 1;
                0.0
            }
        };

        let code = cell(row, cols.code).trim().to_uppercase();
        if code.is_empty() {
            report.empty_codes += 1;
            continue;
        }
        if let Some(needle) = &needle {
            if !code.contains(needle.as_str()) {
                report.search_excluded += 1;
                continue;
            }
        }

        out.push(NormalizedRecord {
            code,
            bucket,
            quantity,
        });
    }

    report.kept_rows = out.len();
    debug!(
        total = report.total_rows,
        kept = report.kept_rows,
        bad_dates = report.bad_dates,
        outside_window = report.outside_window,
        empty_codes = report.empty_codes,
        search_excluded = report.search_excluded,
        coerced = report.coerced_quantities,
        "Normalized records"
    );
    Ok((out, report))
}
