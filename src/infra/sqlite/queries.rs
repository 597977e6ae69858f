use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, types::Value, OptionalExtension};

use crate::infra::sqlite::schema::{init_db, open_connection};

type QueryPageResult = (Vec<String>, Vec<Vec<String>>, i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMeta {
    pub id: i64,
    pub name: String,
    pub label_column: String,
    pub row_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOptions {
    pub search_column: Option<String>,
    pub keyword: String,
    pub sort_column: Option<String>,
    pub sort_desc: bool,
}

pub fn insert_header_names(
    tx: &rusqlite::Transaction<'_>,
    collection_id: i64,
    headers: &[String],
) -> Result<()> {
    let mut insert_header = tx
        .prepare("INSERT INTO column_name(collection_id, col_idx, name) VALUES (?1, ?2, ?3)")
        .context("failed to prepare header insert")?;

    for (col_idx, name) in headers.iter().enumerate() {
        insert_header
            .execute(params![collection_id, col_idx as i64, name])
            .context("failed to insert header")?;
    }

    Ok(())
}

pub fn create_collection_from_rows(
    db_path: &Path,
    name: &str,
    label_column: &str,
    columns: &[String],
    rows: &[Vec<String>],
) -> Result<i64> {
    if !columns.iter().any(|column| column == label_column) {
        anyhow::bail!("label column `{label_column}` is not one of the collection columns");
    }

    init_db(db_path)?;
    if let Some(existing) = find_collection(db_path, name)? {
        purge_collection(db_path, existing.id)?;
    }

    let mut conn = open_connection(db_path)?;
    let tx = conn
        .transaction()
        .context("failed to start collection create transaction")?;

    tx.execute(
        "INSERT INTO collection(name, label_column, row_count) VALUES (?1, ?2, 0)",
        params![name, label_column],
    )
    .context("failed to insert collection")?;
    let collection_id = tx.last_insert_rowid();

    insert_header_names(&tx, collection_id, columns)?;

    let mut insert_cell = tx
        .prepare(
            "INSERT INTO cell(collection_id, row_idx, col_idx, value) VALUES (?1, ?2, ?3, ?4)",
        )
        .context("failed to prepare cell insert")?;
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate().take(columns.len()) {
            insert_cell
                .execute(params![collection_id, row_idx as i64, col_idx as i64, value])
                .context("failed to insert collection cell")?;
        }
    }
    drop(insert_cell);

    tx.execute(
        "UPDATE collection SET row_count = ?1 WHERE id = ?2",
        params![rows.len() as i64, collection_id],
    )
    .context("failed to update collection row_count")?;

    tx.commit().context("failed to commit collection create")?;
    Ok(collection_id)
}

pub fn find_collection(db_path: &Path, name: &str) -> Result<Option<CollectionMeta>> {
    init_db(db_path)?;
    let conn = open_connection(db_path)?;
    conn.query_row(
        "SELECT id, name, label_column, row_count FROM collection WHERE name = ?1",
        [name],
        |row| {
            Ok(CollectionMeta {
                id: row.get(0)?,
                name: row.get(1)?,
                label_column: row.get(2)?,
                row_count: row.get(3)?,
            })
        },
    )
    .optional()
    .with_context(|| format!("failed to look up collection `{name}`"))
}

fn purge_collection(db_path: &Path, collection_id: i64) -> Result<()> {
    let mut conn = open_connection(db_path)?;
    let tx = conn
        .transaction()
        .context("failed to start purge transaction")?;
    tx.execute(
        "DELETE FROM cell WHERE collection_id = ?1",
        params![collection_id],
    )
    .with_context(|| format!("failed to delete cells for collection #{collection_id}"))?;
    tx.execute(
        "DELETE FROM column_name WHERE collection_id = ?1",
        params![collection_id],
    )
    .with_context(|| format!("failed to delete columns for collection #{collection_id}"))?;
    tx.execute("DELETE FROM collection WHERE id = ?1", params![collection_id])
        .with_context(|| format!("failed to delete collection #{collection_id}"))?;
    tx.commit().context("failed to commit purge transaction")?;
    Ok(())
}

fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for ch in keyword.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn column_position(columns: &[String], name: &str, role: &str) -> Result<i64> {
    columns
        .iter()
        .position(|column| column == name)
        .map(|idx| idx as i64)
        .with_context(|| format!("unknown {role} column `{name}` (columns: {})", columns.join(", ")))
}

pub fn query_page(
    db_path: &Path,
    collection_id: i64,
    page_index: i64,
    page_size: i64,
    options: &PageOptions,
) -> Result<QueryPageResult> {
    if page_size <= 0 {
        anyhow::bail!("page_size must be greater than zero")
    }

    let conn = open_connection(db_path)?;

    let columns = column_names(&conn, collection_id)?;

    if columns.is_empty() {
        return Ok((columns, Vec::new(), 0));
    }

    let search_col = options
        .search_column
        .as_deref()
        .map(|name| column_position(&columns, name, "search"))
        .transpose()?;
    let sort_col = options
        .sort_column
        .as_deref()
        .map(|name| column_position(&columns, name, "sort"))
        .transpose()?;

    let mut filter_clauses = vec!["base.collection_id = ?".to_string()];
    let mut filter_params = vec![Value::Integer(collection_id)];

    let keyword = options.keyword.trim();
    if !keyword.is_empty() {
        match search_col {
            Some(search_col) => {
                filter_clauses.push(
                    "EXISTS (
                        SELECT 1 FROM cell cs
                        WHERE cs.collection_id = ?
                          AND cs.row_idx = base.row_idx
                          AND cs.col_idx = ?
                          AND cs.value LIKE ? ESCAPE '\\'
                    )"
                    .to_string(),
                );
                filter_params.push(Value::Integer(collection_id));
                filter_params.push(Value::Integer(search_col));
            }
            None => {
                filter_clauses.push(
                    "EXISTS (
                        SELECT 1 FROM cell gs
                        WHERE gs.collection_id = ?
                          AND gs.row_idx = base.row_idx
                          AND gs.value LIKE ? ESCAPE '\\'
                    )"
                    .to_string(),
                );
                filter_params.push(Value::Integer(collection_id));
            }
        }
        filter_params.push(Value::Text(format!("%{}%", escape_like(keyword))));
    }

    let where_sql = filter_clauses.join(" AND ");

    let count_sql = format!(
        "SELECT COUNT(*)
         FROM (
             SELECT base.row_idx
             FROM cell base
             WHERE {where_sql}
             GROUP BY base.row_idx
         ) filtered"
    );
    let total_rows: i64 = conn
        .query_row(
            &count_sql,
            rusqlite::params_from_iter(filter_params.iter().cloned()),
            |row| row.get(0),
        )
        .context("failed to query filtered row count")?;

    let offset = page_index.max(0).saturating_mul(page_size);
    let sort_direction = if options.sort_desc { "DESC" } else { "ASC" };

    let mut row_params = Vec::<Value>::new();
    let mut row_sql = String::from("SELECT base.row_idx FROM cell base ");
    if let Some(sort_col) = sort_col {
        row_sql.push_str(
            "LEFT JOIN cell sort_cell
             ON sort_cell.collection_id = base.collection_id
            AND sort_cell.row_idx = base.row_idx
            AND sort_cell.col_idx = ? ",
        );
        row_params.push(Value::Integer(sort_col));
    }

    row_sql.push_str(&format!(
        "WHERE {where_sql} GROUP BY base.row_idx ORDER BY "
    ));
    if sort_col.is_some() {
        row_sql.push_str(&format!("COALESCE(sort_cell.value, '') {sort_direction}, "));
    }
    row_sql.push_str("base.row_idx ASC LIMIT ? OFFSET ?");

    row_params.extend(filter_params.iter().cloned());
    row_params.push(Value::Integer(page_size));
    row_params.push(Value::Integer(offset));

    let mut row_stmt = conn
        .prepare(&row_sql)
        .context("failed to prepare page row_idx query")?;
    let row_indices = row_stmt
        .query_map(rusqlite::params_from_iter(row_params), |row| {
            row.get::<_, i64>(0)
        })
        .context("failed to query page row_idx")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect page row_idx")?;
    drop(row_stmt);

    let rows = hydrate_rows(&conn, collection_id, &row_indices, columns.len())?;
    Ok((columns, rows, total_rows))
}

fn column_names(conn: &rusqlite::Connection, collection_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM column_name WHERE collection_id = ?1 ORDER BY col_idx")
        .context("failed to prepare column lookup")?;
    let names = stmt
        .query_map([collection_id], |row| row.get(0))
        .context("failed to look up columns")?
        .collect::<rusqlite::Result<Vec<String>>>()
        .context("failed to read column names")?;
    Ok(names)
}

// Loads the cells of `row_indices`, keeping the order of `row_indices`.
fn hydrate_rows(
    conn: &rusqlite::Connection,
    collection_id: i64,
    row_indices: &[i64],
    width: usize,
) -> Result<Vec<Vec<String>>> {
    if row_indices.is_empty() {
        return Ok(Vec::new());
    }

    let slots: HashMap<i64, usize> = row_indices
        .iter()
        .enumerate()
        .map(|(slot, &row_idx)| (row_idx, slot))
        .collect();
    let sql = format!(
        "SELECT row_idx, col_idx, value FROM cell
         WHERE collection_id = ? AND row_idx IN ({})",
        vec!["?"; row_indices.len()].join(",")
    );
    let params = std::iter::once(Value::Integer(collection_id))
        .chain(row_indices.iter().copied().map(Value::Integer));

    let mut stmt = conn.prepare(&sql).context("failed to prepare cell lookup")?;
    let cells = stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .context("failed to look up page cells")?;

    let mut rows = vec![vec![String::new(); width]; row_indices.len()];
    for cell in cells {
        let (row_idx, col_idx, value) = cell.context("failed to read page cell")?;
        let target = slots
            .get(&row_idx)
            .and_then(|&slot| rows.get_mut(slot))
            .and_then(|row| usize::try_from(col_idx).ok().and_then(|col| row.get_mut(col)));
        if let Some(target) = target {
            *target = value;
        }
    }
    Ok(rows)
}
