use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::infra::sqlite::queries::create_collection_from_rows;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportResult {
    pub collection_id: i64,
    pub row_count: i64,
}

pub fn read_csv_table<R: Read>(reader: R) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader
        .headers()
        .context("failed to read csv headers")?
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        anyhow::bail!("csv header is required")
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to parse csv record")?;
        let row = (0..headers.len())
            .map(|col_idx| record.get(col_idx).unwrap_or("").to_string())
            .collect();
        rows.push(row);
    }

    Ok((headers, rows))
}

pub fn import_csv_collection(
    db_path: &Path,
    csv_path: &Path,
    label_column: &str,
) -> Result<ImportResult> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open csv: {}", csv_path.display()))?;
    let (columns, rows) = read_csv_table(file)
        .with_context(|| format!("failed to read csv: {}", csv_path.display()))?;

    let collection_name = csv_path
        .file_stem()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("collection")
        .to_string();

    let collection_id =
        create_collection_from_rows(db_path, &collection_name, label_column, &columns, &rows)?;

    Ok(ImportResult {
        collection_id,
        row_count: rows.len() as i64,
    })
}
