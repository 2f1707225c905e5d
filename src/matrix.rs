use crate::aggregate::Aggregates;
use crate::types::{
    CategoryFilter, LengthCategory, MatrixRow, MatrixSummary, MonthBucket, MonthTotal,
    NormalizeReport, ResultMatrix,
};
use crate::util::natural_cmp;
use tracing::debug;

/// Assemble the codes-by-months matrix.
///
/// Rows are categorised by code length, filtered by `filter`, then sorted by
/// category and natural code order. Each row's quantities follow `buckets`.
pub fn build(
    aggregates: &Aggregates,
    buckets: &[MonthBucket],
    filter: CategoryFilter,
) -> ResultMatrix {
    let mut rows: Vec<MatrixRow> = aggregates
        .iter()
        .map(|(code, cells)| (code, LengthCategory::of(code), cells))
        .filter(|(_, category, _)| filter.matches(*category))
        .map(|(code, category, cells)| MatrixRow {
            code: code.clone(),
            category,
            quantities: buckets
                .iter()
                .map(|b| cells.get(b).copied().unwrap_or(0.0))
                .collect(),
        })
        .collect();

    // `sort_by` is stable, so codes equal under both keys keep their order.
    rows.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| natural_cmp(&a.code, &b.code))
    });

    debug!(
        rows = rows.len(),
        dropped = aggregates.len() - rows.len(),
        filter = %filter,
        "Built result matrix"
    );
    ResultMatrix {
        buckets: buckets.to_vec(),
        rows,
    }
}

pub fn summarize(matrix: &ResultMatrix, normalization: &NormalizeReport) -> MatrixSummary {
    let mut codes_by_category = [0usize; 3];
    for row in &matrix.rows {
        codes_by_category[row.category.number() as usize - 1] += 1;
    }
    let column_totals = matrix.column_totals();
    let total_quantity: f64 = column_totals.iter().sum();
    let monthly_totals = matrix
        .buckets
        .iter()
        .zip(column_totals)
        .map(|(month, total)| MonthTotal {
            month: *month,
            total,
        })
        .collect();
    MatrixSummary {
        first_month: matrix.buckets.first().copied(),
        last_month: matrix.buckets.last().copied(),
        month_columns: matrix.buckets.len(),
        total_codes: matrix.len(),
        codes_by_category,
        total_quantity,
        monthly_totals,
        normalization: normalization.clone(),
    }
}
