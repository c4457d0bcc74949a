//! Fact retrieval. The pipeline only sees the `Vec<Fact>` a source returns,
//! never where it came from.

use crate::error::Result;
use crate::loader::{load_facts, FactTable};
use crate::types::Fact;
use std::path::PathBuf;

/// Optional narrowing of a fetch to one ward and/or one category code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactFilter {
    pub ward: Option<u32>,
    pub category: Option<String>,
}

impl FactFilter {
    pub fn ward(ward: u32) -> Self {
        Self {
            ward: Some(ward),
            category: None,
        }
    }

    pub fn category(code: impl Into<String>) -> Self {
        Self {
            ward: None,
            category: Some(code.into()),
        }
    }

    pub fn matches(&self, fact: &Fact) -> bool {
        self.ward.map_or(true, |w| w == fact.ward_number)
            && self
                .category
                .as_deref()
                .map_or(true, |c| c == fact.category_code)
    }
}

pub trait FactSource {
    /// Facts of `dimension` matching `filter`. An unknown dimension yields
    /// no facts.
    fn fetch(&self, dimension: &str, filter: &FactFilter) -> Result<Vec<Fact>>;
}

/// Facts already held in memory, e.g. the result of one CSV load.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    table: FactTable,
}

impl InMemorySource {
    pub fn new(table: FactTable) -> Self {
        Self { table }
    }

    pub fn with_facts(mut self, dimension: impl Into<String>, facts: Vec<Fact>) -> Self {
        self.table.entry(dimension.into()).or_default().extend(facts);
        self
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl FactSource for InMemorySource {
    fn fetch(&self, dimension: &str, filter: &FactFilter) -> Result<Vec<Fact>> {
        Ok(self
            .table
            .get(dimension)
            .map(|facts| facts.iter().filter(|f| filter.matches(f)).cloned().collect())
            .unwrap_or_default())
    }
}

/// Reads the fact CSV on every fetch.
#[derive(Debug, Clone)]
pub struct CsvFactSource {
    path: PathBuf,
}

impl CsvFactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FactSource for CsvFactSource {
    fn fetch(&self, dimension: &str, filter: &FactFilter) -> Result<Vec<Fact>> {
        let (table, report) = load_facts(&self.path)?;
        if report.rejected_rows > 0 {
            log::warn!(
                "{} rows rejected while reading {}",
                report.rejected_rows,
                self.path.display()
            );
        }
        InMemorySource::new(table).fetch(dimension, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> InMemorySource {
        InMemorySource::default().with_facts(
            "countries",
            vec![
                Fact::new(1, "QATAR", 100).unwrap(),
                Fact::new(1, "INDIA", 50).unwrap(),
                Fact::new(2, "QATAR", 30).unwrap(),
            ],
        )
    }

    #[test]
    fn fetch_all() {
        let facts = source().fetch("countries", &FactFilter::default()).unwrap();
        assert_eq!(facts.len(), 3);
    }

    #[test]
    fn fetch_by_ward_and_category() {
        let src = source();
        assert_eq!(src.fetch("countries", &FactFilter::ward(1)).unwrap().len(), 2);
        let qatar = src.fetch("countries", &FactFilter::category("QATAR")).unwrap();
        assert_eq!(qatar.iter().map(|f| f.count).sum::<u64>(), 130);
        let both = FactFilter {
            ward: Some(2),
            category: Some("INDIA".to_string()),
        };
        assert!(src.fetch("countries", &both).unwrap().is_empty());
    }

    #[test]
    fn unknown_dimension_is_empty() {
        assert!(source().fetch("roads", &FactFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn csv_source_filters() {
        let path = std::env::temp_dir().join(format!("ward_profile_source_{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "dimension,ward_number,category_code,count\ncountries,1,QATAR,10\ncountries,2,QATAR,5\n",
        )
        .unwrap();
        let facts = CsvFactSource::new(&path)
            .fetch("countries", &FactFilter::ward(2))
            .unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(facts, vec![Fact::new(2, "QATAR", 5).unwrap()]);
    }
}
