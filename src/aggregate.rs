use crate::types::{MonthBucket, NormalizedRecord};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Per-code monthly sums; every code carries one entry per header month.
pub type Aggregates = BTreeMap<String, BTreeMap<MonthBucket, f64>>;

/// Sum quantities by (code, month) and zero-fill the months a code never
/// appears in.
///
/// `buckets` must be in ascending order. Records whose month is not one of
/// them have no column to land in and are skipped.
pub fn aggregate(records: &[NormalizedRecord], buckets: &[MonthBucket]) -> Aggregates {
    let mut map: Aggregates = BTreeMap::new();
    for r in records {
        if buckets.binary_search(&r.bucket).is_err() {
            trace!(code = %r.code, month = %r.bucket, "Record outside header months");
            continue;
        }
        let cells = map.entry(r.code.clone()).or_default();
        *cells.entry(r.bucket).or_insert(0.0) += r.quantity;
    }
    for cells in map.values_mut() {
        for b in buckets {
            cells.entry(*b).or_insert(0.0);
        }
    }
    debug!(codes = map.len(), months = buckets.len(), "Aggregated quantities");
    map
}
