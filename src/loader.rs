use crate::error::Result;
use crate::types::{Fact, RawFactRow};
use crate::util::{non_empty, parse_count_safe, parse_ward_safe};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Facts grouped by dimension name.
pub type FactTable = BTreeMap<String, Vec<Fact>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub rejected_rows: usize,
    pub dimensions: usize,
}

pub fn load_facts(path: impl AsRef<Path>) -> Result<(FactTable, LoadReport)> {
    let file = std::fs::File::open(path.as_ref())?;
    load_facts_from_reader(file)
}

/// Reads `dimension,ward_number,category_code,count` rows.
///
/// Rows with a missing dimension or code, a non-positive ward, or a
/// negative or fractional count are rejected and counted, never summed.
pub fn load_facts_from_reader<R: Read>(reader: R) -> Result<(FactTable, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut total_rows = 0usize;
    let mut rejected_rows = 0usize;
    let mut table = FactTable::new();

    for (line, result) in rdr.deserialize::<RawFactRow>().enumerate() {
        total_rows += 1;
        // Header is line 1.
        let line = line + 2;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Row {line}: unreadable ({e})");
                rejected_rows += 1;
                continue;
            }
        };

        let Some(dimension) = non_empty(row.dimension.as_deref()) else {
            log::warn!("Row {line}: missing dimension");
            rejected_rows += 1;
            continue;
        };
        let Some(category_code) = non_empty(row.category_code.as_deref()) else {
            log::warn!("Row {line}: missing category code");
            rejected_rows += 1;
            continue;
        };
        let Some(ward_number) = parse_ward_safe(row.ward_number.as_deref()) else {
            log::warn!(
                "Row {line}: invalid ward number '{}'",
                row.ward_number.as_deref().unwrap_or_default()
            );
            rejected_rows += 1;
            continue;
        };
        let Some(count) = parse_count_safe(row.count.as_deref()) else {
            log::warn!(
                "Row {line}: invalid count '{}' for ward {ward_number}, '{category_code}'",
                row.count.as_deref().unwrap_or_default()
            );
            rejected_rows += 1;
            continue;
        };

        table.entry(dimension).or_default().push(Fact {
            ward_number,
            category_code,
            count,
        });
    }

    let report = LoadReport {
        total_rows,
        loaded_rows: total_rows - rejected_rows,
        rejected_rows,
        dimensions: table.len(),
    };
    Ok((table, report))
}
