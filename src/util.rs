// Utility helpers for parsing and number formatting.
//
// CSV cells arrive as loose strings; everything here turns them into
// typed values or rejects them, so the pipeline only ever sees clean facts.
use crate::config::MAX_FACT_COUNT;
use num_format::{Locale, ToFormattedString};

/// Parse a ward number. Only positive integers are accepted.
pub fn parse_ward_safe(s: Option<&str>) -> Option<u32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<u32>().ok().filter(|w| *w > 0)
}

/// Parse a count cell into a non-negative integer.
///
/// - Trims whitespace and strips thousands separators like `","`.
/// - Accepts integral decimals such as `"12.0"` from spreadsheet exports.
/// - Rejects negatives, fractions, and anything alphabetic.
/// - Rejects counts above [`MAX_FACT_COUNT`].
pub fn parse_count_safe(s: Option<&str>) -> Option<u64> {
    let s = s?.trim();
    if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    if let Ok(v) = s.parse::<u64>() {
        return (v <= MAX_FACT_COUNT).then_some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= MAX_FACT_COUNT as f64 {
        Some(f as u64)
    } else {
        None
    }
}

pub fn non_empty(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
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
    n.to_formatted_string(&Locale::en)
}

/// Approximate equality for floating results.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
