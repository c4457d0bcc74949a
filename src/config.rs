//! Business constants and runtime configuration.

use crate::error::{ProfileError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Representative amount for an open-ended top bucket is `range_min`
/// times this markup (20% above the bucket floor).
pub const OPEN_BUCKET_MARKUP: f64 = 1.2;

/// Assumed yearly remittance per person abroad, in NPR, used for
/// per-capita flow estimates. Pages of the profile have quoted other
/// figures; this is the value every report in this crate uses.
pub const AVERAGE_REMITTANCE_PER_PERSON: f64 = 500_000.0;

/// Largest count one fact may carry. No ward has anywhere near a billion
/// people or households, so a larger value is a data error.
pub const MAX_FACT_COUNT: u64 = 1_000_000_000;

/// Digital access index weights by facility code.
pub const DIGITAL_ACCESS_WEIGHTS: &[(&str, f64)] = &[
    ("INTERNET", 0.4),
    ("COMPUTER", 0.3),
    ("MOBILE_PHONE", 0.2),
    ("TELEVISION", 0.1),
];

/// Allowed distance of a weight set's sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Rows shown individually before the rest is folded into one residual row.
pub const DEFAULT_TOP_N: usize = 5;

pub const DEFAULT_CONFIG_FILE: &str = "ward_profile.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// CSV with `dimension,ward_number,category_code,count` columns.
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub top_n: usize,
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("ward_facts.csv"),
            output_dir: PathBuf::from("reports"),
            top_n: DEFAULT_TOP_N,
            preview_rows: 6,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        if config.top_n == 0 {
            return Err(ProfileError::Config {
                message: "top_n must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// An explicit path must exist; otherwise `ward_profile.toml` in the
    /// working directory is used when present, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            log::info!("Using configuration from {}", fallback.display());
            return Self::from_path(fallback);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digital_weights_sum_to_one() {
        let sum: f64 = DIGITAL_ACCESS_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((sum - 1.0).abs() <= WEIGHT_TOLERANCE);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str("top_n = 6\n").unwrap();
        assert_eq!(config.top_n, 6);
        assert_eq!(config.output_dir, PathBuf::from("reports"));
    }

    #[test]
    fn rejects_zero_top_n() {
        assert!(AppConfig::from_toml_str("top_n = 0\n").is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = AppConfig::from_toml_str("top_n = \"five\"").unwrap_err();
        assert!(matches!(err, ProfileError::Toml(_)));
    }
}
