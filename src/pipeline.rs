// One pass from raw table + configuration to a finished matrix.
//
// A run has no state of its own: the same table and config always give the
// same matrix, so callers can keep the table and re-run on every settings
// change.
use crate::aggregate::aggregate;
use crate::buckets::{buckets_in, window_at};
use crate::error::Result;
use crate::matrix::build;
use crate::normalize::normalize;
use crate::types::{CategoryFilter, NormalizeReport, RawTable, ResultMatrix, WindowMode};
use chrono::{Datelike, Local, NaiveDate};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub start_month: u32,
    pub start_year: i32,
    pub mode: WindowMode,
    pub category_filter: CategoryFilter,
    pub search: Option<String>,
}

impl Default for PipelineConfig {
    /// January of last year, rolling to now, every category, no search.
    fn default() -> Self {
        Self {
            start_month: 1,
            start_year: Local::now().year() - 1,
            mode: WindowMode::default(),
            category_filter: CategoryFilter::default(),
            search: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub matrix: ResultMatrix,
    pub report: NormalizeReport,
}

/// Run the pipeline with "now" fixed to `today`.
pub fn run_at(
    table: &RawTable,
    config: &PipelineConfig,
    today: NaiveDate,
) -> Result<PipelineOutput> {
    let window = window_at(config.start_month, config.start_year, config.mode, today)?;
    let buckets = buckets_in(window);
    let (records, report) = normalize(table, window, config.search.as_deref())?;
    let aggregates = aggregate(&records, &buckets);
    let matrix = build(&aggregates, &buckets, config.category_filter);
    info!(
        rows = matrix.len(),
        months = buckets.len(),
        mode = %config.mode,
        filter = %config.category_filter,
        "Pipeline run complete"
    );
    Ok(PipelineOutput { matrix, report })
}

pub fn run(table: &RawTable, config: &PipelineConfig) -> Result<PipelineOutput> {
    run_at(table, config, Local::now().date_naive())
}
