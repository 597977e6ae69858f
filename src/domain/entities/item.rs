use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entities::table::RowId;

pub type Extra = BTreeMap<String, Value>;

/// A row the presentation layer can address by id and by column.
pub trait TableRow {
    fn row_id(&self) -> RowId;
    fn field(&self, column_id: &str) -> Option<String>;
}

/// List entry with the two fields every list view relies on. Anything else
/// the backend sends is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem<E = Extra> {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub extra: E,
}

impl ListItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            extra: Extra::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl TableRow for ListItem {
    fn row_id(&self) -> RowId {
        RowId(self.id.clone())
    }

    fn field(&self, column_id: &str) -> Option<String> {
        match column_id {
            "id" => Some(self.id.clone()),
            "label" => Some(self.label.clone()),
            other => self.extra.get(other).map(value_to_cell),
        }
    }
}

pub fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}
