use serde::Serialize;
use std::fmt;
use std::str::FromStr;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Every row of the source file, materialized in memory.
///
/// Kept around between pipeline runs so a configuration change only
/// recomputes the matrix instead of re-reading the file.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A single calendar month, ordered by (year, month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
}

impl MonthBucket {
    /// Returns `None` when `month` is outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date<D: chrono::Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following calendar month; December rolls into January.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Moves forward by `months` calendar months.
    pub fn plus_months(self, months: u32) -> Self {
        let zero_based = self.month as i64 - 1 + months as i64;
        Self {
            year: self.year + (zero_based / 12) as i32,
            month: (zero_based % 12) as u32 + 1,
        }
    }

    /// Short label such as `Jan 2023`, used for column headers.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = MONTH_ABBREVIATIONS[(self.month as usize + 11) % 12];
        write!(f, "{} {}", name, self.year)
    }
}

impl FromStr for MonthBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, year) = s
            .split_once(' ')
            .ok_or_else(|| format!("not a month label: {s:?}"))?;
        let month = MONTH_ABBREVIATIONS
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| format!("unknown month {name:?}"))?;
        let year: i32 = year
            .trim()
            .parse()
            .map_err(|_| format!("invalid year in {s:?}"))?;
        Ok(Self {
            year,
            month: month as u32 + 1,
        })
    }
}

impl Serialize for MonthBucket {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inclusive month range used to filter records.
///
/// A window whose start is after its end contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: MonthBucket,
    pub end: MonthBucket,
}

impl Window {
    pub fn new(start: MonthBucket, end: MonthBucket) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, bucket: MonthBucket) -> bool {
        self.start <= bucket && bucket <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Where the header range stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowMode {
    /// Up to and including the current calendar month.
    #[default]
    RollingToNow,
    /// Exactly twelve months starting at the start month.
    Fixed12,
}

impl FromStr for WindowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rolling" | "rolling-to-now" | "now" => Ok(Self::RollingToNow),
            "fixed12" | "fixed-12" | "fixed" | "12" => Ok(Self::Fixed12),
            other => Err(format!(
                "unknown window mode {other:?} (expected rolling or fixed12)"
            )),
        }
    }
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RollingToNow => f.write_str("rolling"),
            Self::Fixed12 => f.write_str("fixed12"),
        }
    }
}

/// Three-bin classification of a code by character count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LengthCategory {
    /// 5 characters or fewer.
    Short = 1,
    /// 6 to 10 characters.
    Medium = 2,
    /// More than 10 characters.
    Long = 3,
}

impl LengthCategory {
    pub fn of(code: &str) -> Self {
        match code.chars().count() {
            0..=5 => Self::Short,
            6..=10 => Self::Medium,
            _ => Self::Long,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(LengthCategory),
}

impl CategoryFilter {
    pub fn matches(self, category: LengthCategory) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "all" | "alldata" => Ok(Self::All),
            "1" | "set1" | "cat1" => Ok(Self::Only(LengthCategory::Short)),
            "2" | "set2" | "cat2" => Ok(Self::Only(LengthCategory::Medium)),
            "3" | "set3" | "cat3" => Ok(Self::Only(LengthCategory::Long)),
            _ => Err(format!(
                "unknown filter {s:?} (expected all, 1, 2 or 3)"
            )),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(c) => write!(f, "{}", c.number()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub code: String,
    pub bucket: MonthBucket,
    pub quantity: f64,
}

/// Counts of what normalization kept, dropped and coerced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub bad_dates: usize,
    pub outside_window: usize,
    pub empty_codes: usize,
    pub search_excluded: usize,
    pub coerced_quantities: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub code: String,
    pub category: LengthCategory,
    /// Aligned 1:1 with `ResultMatrix::buckets`.
    pub quantities: Vec<f64>,
}

/// Codes by months. Built once per run and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultMatrix {
    pub buckets: Vec<MonthBucket>,
    pub rows: Vec<MatrixRow>,
}

impl ResultMatrix {
    /// `code` followed by one label per month column.
    pub fn header_labels(&self) -> Vec<String> {
        std::iter::once("code".to_string())
            .chain(self.buckets.iter().map(MonthBucket::label))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_totals(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.buckets.len()];
        for row in &self.rows {
            for (t, q) in totals.iter_mut().zip(&row.quantities) {
                *t += q;
            }
        }
        totals
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthTotal {
    pub month: MonthBucket,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixSummary {
    pub first_month: Option<MonthBucket>,
    pub last_month: Option<MonthBucket>,
    pub month_columns: usize,
    pub total_codes: usize,
    pub codes_by_category: [usize; 3],
    pub total_quantity: f64,
    pub monthly_totals: Vec<MonthTotal>,
    pub normalization: NormalizeReport,
}
