use thiserror::Error;

/// Errors raised while loading facts or deriving indicators.
///
/// Empty inputs and unknown category codes are not errors: the former
/// aggregates to zeros and the latter resolves to the `OTHER` group.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// A weight set that does not sum to 1.0, is empty, or has a negative weight.
    #[error("Invalid weights for index '{index}': {message} (sum = {sum})")]
    InvalidWeights {
        index: String,
        sum: f64,
        message: String,
    },

    /// A count that is negative, not an integer, or above the per-fact cap.
    #[error("Invalid count '{raw}' for ward {ward}, category '{code}'")]
    InvalidCount {
        ward: String,
        code: String,
        raw: String,
    },

    /// A ward number that is not a positive integer.
    #[error("Invalid ward number '{raw}'")]
    InvalidWard { raw: String },

    /// A flow estimate was requested for a category without a numeric range.
    #[error("Category '{code}' has no numeric range to estimate a flow from")]
    UnrangedBucket { code: String },

    /// A sum of counts that no longer fits in a `u64`.
    #[error("Count overflow while summing '{code}' in dimension '{dimension}'")]
    CountOverflow { dimension: String, code: String },

    #[error("Unknown dimension '{name}'")]
    UnknownDimension { name: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ProfileError>;
