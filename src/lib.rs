//! Ward-level statistics pipeline for a municipal digital profile.
//!
//! Raw `(ward, category, count)` facts flow through the
//! [`aggregate`](aggregate::aggregate) step, the [`indicators`] engine and
//! the [`reports`] assembler. Every stage is a pure function of its
//! inputs; registries and weight sets are passed in per dimension.

pub mod aggregate;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod indicators;
pub mod loader;
pub mod output;
pub mod registry;
pub mod reports;
pub mod source;
pub mod types;
pub mod util;

pub use aggregate::{aggregate, Aggregation};
pub use error::{ProfileError, Result};
pub use registry::CategoryRegistry;
pub use types::{CategoryDefinition, Fact, Percentage};
