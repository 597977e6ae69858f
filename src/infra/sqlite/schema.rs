use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign key enforcement")?;
    Ok(conn)
}

pub fn init_db(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }

    let conn = open_connection(db_path)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS collection (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            name          TEXT NOT NULL UNIQUE,
            label_column  TEXT NOT NULL,
            row_count     INTEGER NOT NULL,
            imported_at   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS column_name (
            collection_id INTEGER NOT NULL,
            col_idx       INTEGER NOT NULL,
            name          TEXT NOT NULL,
            PRIMARY KEY (collection_id, col_idx),
            FOREIGN KEY (collection_id) REFERENCES collection(id)
        );

        CREATE TABLE IF NOT EXISTS cell (
            collection_id INTEGER NOT NULL,
            row_idx       INTEGER NOT NULL,
            col_idx       INTEGER NOT NULL,
            value         TEXT NOT NULL,
            PRIMARY KEY (collection_id, row_idx, col_idx),
            FOREIGN KEY (collection_id) REFERENCES collection(id)
        );

        CREATE INDEX IF NOT EXISTS idx_cell_collection_row
            ON cell(collection_id, row_idx);

        CREATE INDEX IF NOT EXISTS idx_cell_collection_col_value
            ON cell(collection_id, col_idx, value);
        ",
    )
    .context("failed to initialize schema")?;

    Ok(())
}
