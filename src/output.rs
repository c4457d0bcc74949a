use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of the first `max_rows` rows, or `(no rows)`.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RankingRow;

    fn rows() -> Vec<RankingRow> {
        vec![
            RankingRow {
                rank: 1,
                category: "Qatar".to_string(),
                count: "130".to_string(),
                percentage: "72.22".to_string(),
            },
            RankingRow {
                rank: 2,
                category: "India".to_string(),
                count: "50".to_string(),
                percentage: "27.78".to_string(),
            },
        ]
    }

    #[test]
    fn renders_markdown_preview() {
        let table = render_table(&rows(), 1);
        assert!(table.contains("| Rank"));
        assert!(table.contains("Qatar"));
        assert!(!table.contains("India"));
        assert_eq!(render_table::<RankingRow>(&[], 3), "(no rows)");
    }

    #[test]
    fn writes_csv_with_headers() {
        let path = std::env::temp_dir().join(format!("ward_profile_out_{}.csv", std::process::id()));
        write_csv(&path, &rows()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(written.starts_with("Rank,Category,Count,Percentage\n"));
        assert!(written.contains("1,Qatar,130,72.22"));
    }
}
