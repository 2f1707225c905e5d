// Utility helpers for parsing and formatting.
//
// All of the forgiving "dirty cell" handling lives here so the pipeline
// stages can work with typed values.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse a date cell, trying the layouts spreadsheet exports commonly use.
///
/// Returns `None` for empty or unrecognised text; callers drop such rows.
pub fn parse_date_safe(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Parse a quantity cell into a finite, non-negative `f64`.
///
/// - Trims whitespace.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for empty, non-numeric, non-finite or negative values.
pub fn parse_quantity(s: &str) -> Option<f64> {
    let s = s.trim().replace(',', "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;
    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(make_chunk(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(prev) = in_digits {
        out.push(make_chunk(&s[start..], prev));
    }
    out
}

fn make_chunk(s: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Digits(s)
    } else {
        Chunk::Text(s)
    }
}

// Compares digit runs by integer value without parsing, so arbitrarily
// long runs cannot overflow.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural ("alphanumeric aware") string ordering: `MAT2` < `MAT10`.
///
/// Digit runs compare by value, other runs case-insensitively, run by run.
/// At a position where one side has digits and the other text, digits
/// sort first.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ca, cb) = (chunks(a), chunks(b));
    for (x, y) in ca.iter().zip(cb.iter()) {
        let ord = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len())
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus `en` thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages, e.g. `9,855 rows loaded`.
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let jan15 = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        assert_eq!(parse_date_safe("2023-01-15"), Some(jan15));
        assert_eq!(parse_date_safe(" 2023/01/15 "), Some(jan15));
        assert_eq!(parse_date_safe("01/15/2023"), Some(jan15));
        assert_eq!(parse_date_safe("15.01.2023"), Some(jan15));
        assert_eq!(parse_date_safe("2023-01-15 08:30:00"), Some(jan15));
        assert_eq!(parse_date_safe("2023-01-15T08:30:00"), Some(jan15));
        assert_eq!(parse_date_safe("2023-01-15T08:30:00+02:00"), Some(jan15));
    }

    #[test]
    fn test_parse_date_month_names_and_minutes() {
        let jan15 = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        assert_eq!(parse_date_safe("2023-01-15 08:30"), Some(jan15));
        assert_eq!(parse_date_safe("15-Jan-2023"), Some(jan15));
        assert_eq!(parse_date_safe("15-jan-2023"), Some(jan15));
        assert_eq!(parse_date_safe("Jan 15, 2023"), Some(jan15));
        assert_eq!(parse_date_safe("Feb 30, 2023"), None);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date_safe(""), None);
        assert_eq!(parse_date_safe("   "), None);
        assert_eq!(parse_date_safe("not a date"), None);
        assert_eq!(parse_date_safe("2023-13-45"), None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("10"), Some(10.0));
        assert_eq!(parse_quantity(" 3,000 "), Some(3000.0));
        assert_eq!(parse_quantity("1,234.5"), Some(1234.5));
        assert_eq!(parse_quantity("0"), Some(0.0));
    }

    #[test]
    fn test_parse_quantity_rejects() {
        assert_eq!(parse_quantity("abc"), None);
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity(","), None);
        assert_eq!(parse_quantity("-5"), None);
        assert_eq!(parse_quantity("NaN"), None);
        assert_eq!(parse_quantity("inf"), None);
    }

    #[test]
    fn test_natural_cmp_numbers() {
        assert_eq!(natural_cmp("MAT2", "MAT10"), Ordering::Less);
        assert_eq!(natural_cmp("MAT10", "MAT1"), Ordering::Greater);
        assert_eq!(natural_cmp("MAT1", "MAT1"), Ordering::Equal);
        assert_eq!(natural_cmp("MAT01", "MAT1"), Ordering::Equal);
    }

    #[test]
    fn test_natural_cmp_sorts_list() {
        let mut codes = vec!["MAT10", "MAT2", "MAT1"];
        codes.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(codes, vec!["MAT1", "MAT2", "MAT10"]);
    }

    #[test]
    fn test_natural_cmp_text_and_prefixes() {
        assert_eq!(natural_cmp("abc", "ABD"), Ordering::Less);
        assert_eq!(natural_cmp("AB", "AB1"), Ordering::Less);
        assert_eq!(natural_cmp("1AB", "AB"), Ordering::Less);
        assert_eq!(natural_cmp("A2B3", "A2B10"), Ordering::Less);
        assert_eq!(
            natural_cmp("X99999999999999999999999", "X100000000000000000000000"),
            Ordering::Less
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(0.0, 2), "0.00");
        assert_eq!(format_number(-1500.0, 1), "-1,500.0");
        assert_eq!(format_number(42.0, 0), "42");
    }

    #[test]
    fn test_format_int() {
        assert_eq!(format_int(9855usize), "9,855");
    }
}
