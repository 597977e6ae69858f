//! Decoding of the dashboard backend's list envelope.
//!
//! Every list endpoint answers with
//! `{ "status": "success" | "error", "error": ..., "metadata": { "pagination": ... }, "data": ... }`.
//! Rows sit under `data.<rows_key>`, either as an array or as a record keyed
//! by id. The total comes from whichever pagination block is present.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::usecase::ports::source::{ListPage, SourceError};

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationMeta {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub total_pages: u64,
    pub total_items: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub pagination: Option<PaginationMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Option<ResponseMetadata>,
    #[serde(default)]
    pub data: Value,
}

impl ListEnvelope {
    pub fn into_page<T: DeserializeOwned>(self, rows_key: &str) -> Result<ListPage<T>, SourceError> {
        if self.status != "success" {
            return Err(SourceError::Api(
                self.error
                    .unwrap_or_else(|| format!("status `{}`", self.status)),
            ));
        }

        let Value::Object(mut data) = self.data else {
            return Err(SourceError::Decode("`data` is not an object".to_string()));
        };

        let rows_value = data.remove(rows_key).unwrap_or(Value::Array(Vec::new()));
        let rows: Vec<T> = match rows_value {
            Value::Array(items) => items
                .into_iter()
                .map(decode_row)
                .collect::<Result<_, _>>()?,
            Value::Object(record) => record_rows(record)?,
            Value::Null => Vec::new(),
            other => {
                return Err(SourceError::Decode(format!(
                    "`data.{rows_key}` must be an array or object, got {other}"
                )))
            }
        };

        let nested_total = data
            .get("metadata")
            .cloned()
            .and_then(|value| serde_json::from_value::<ResponseMetadata>(value).ok())
            .and_then(|metadata| metadata.pagination)
            .map(|pagination| pagination.total_items);
        let top_total = self
            .metadata
            .and_then(|metadata| metadata.pagination)
            .map(|pagination| pagination.total_items);
        let count = data.get("count").and_then(Value::as_u64);

        let total_count = nested_total
            .or(top_total)
            .or(count)
            .unwrap_or(rows.len() as u64);

        Ok(ListPage { rows, total_count })
    }
}

fn decode_row<T: DeserializeOwned>(value: Value) -> Result<T, SourceError> {
    serde_json::from_value(value).map_err(|err| SourceError::Decode(err.to_string()))
}

/// Record entries become rows. Object entries get their key as `id` when
/// they carry none; scalar entries become `{ id, label }` pairs.
fn record_rows<T: DeserializeOwned>(record: Map<String, Value>) -> Result<Vec<T>, SourceError> {
    record
        .into_iter()
        .map(|(key, value)| {
            let row = match value {
                Value::Object(mut fields) => {
                    fields
                        .entry("id".to_string())
                        .or_insert_with(|| Value::String(key.clone()));
                    if !fields.contains_key("label") {
                        let label = fields
                            .get("name")
                            .cloned()
                            .unwrap_or_else(|| Value::String(key.clone()));
                        fields.insert("label".to_string(), label);
                    }
                    Value::Object(fields)
                }
                scalar => {
                    let mut fields = Map::new();
                    fields.insert("id".to_string(), Value::String(key.clone()));
                    fields.insert("label".to_string(), Value::String(key));
                    fields.insert("value".to_string(), scalar);
                    Value::Object(fields)
                }
            };
            decode_row(row)
        })
        .collect()
}
