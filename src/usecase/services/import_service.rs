use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;

use crate::infra::import::csv::{import_csv_collection, ImportResult};
use crate::infra::import::sample::{water_level_sample, WATER_LEVEL_COLLECTION};
use crate::infra::sqlite::queries::{create_collection_from_rows, find_collection};

pub struct ImportService {
    db_path: PathBuf,
}

impl ImportService {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    pub fn import_csv(&self, path: &Path, label_column: &str) -> Result<ImportResult> {
        import_csv_collection(&self.db_path, path, label_column)
    }

    pub fn ensure_sample(&self) -> Result<ImportResult> {
        if let Some(meta) = find_collection(&self.db_path, WATER_LEVEL_COLLECTION)? {
            return Ok(ImportResult {
                collection_id: meta.id,
                row_count: meta.row_count,
            });
        }
        let (columns, rows) = water_level_sample(Local::now(), 24);
        let collection_id = create_collection_from_rows(
            &self.db_path,
            WATER_LEVEL_COLLECTION,
            "station",
            &columns,
            &rows,
        )?;
        Ok(ImportResult {
            collection_id,
            row_count: rows.len() as i64,
        })
    }
}
