use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::entities::item::{Extra, ListItem};
use crate::domain::entities::table::SortOrder;
use crate::infra::sqlite::queries::{find_collection, query_page, PageOptions};
use crate::platform::desktop::blocking::run_blocking;
use crate::usecase::ports::source::{ListPage, ListRequest, ListSource, SourceError};

#[derive(Debug, Clone)]
pub struct SqliteListSource {
    pub db_path: PathBuf,
    pub collection: String,
    pub search_column: Option<String>,
}

impl SqliteListSource {
    pub fn new(
        db_path: impl Into<PathBuf>,
        collection: impl Into<String>,
        search_column: Option<String>,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            collection: collection.into(),
            search_column,
        }
    }

    fn load(&self, request: &ListRequest) -> Result<ListPage<ListItem>> {
        let descriptor = &request.descriptor;
        let Some(meta) = find_collection(&self.db_path, &self.collection)? else {
            anyhow::bail!("collection `{}` does not exist", self.collection);
        };

        let options = PageOptions {
            search_column: self.search_column.clone(),
            keyword: descriptor.keyword.clone().unwrap_or_default(),
            sort_column: descriptor.sort_by.clone(),
            sort_desc: matches!(descriptor.sort_order, Some(SortOrder::Desc)),
        };
        let page_index = descriptor.page.saturating_sub(1) as i64;
        let (columns, rows, total_rows) = query_page(
            &self.db_path,
            meta.id,
            page_index,
            descriptor.size as i64,
            &options,
        )?;

        let label_idx = columns.iter().position(|column| *column == meta.label_column);
        let id_idx = columns.iter().position(|column| column == "id");
        let offset = descriptor.offset();

        let items = rows
            .into_iter()
            .enumerate()
            .map(|(pos, row)| {
                let id = match id_idx {
                    Some(idx) => row[idx].clone(),
                    None => (offset + pos).to_string(),
                };
                let label = label_idx.map(|idx| row[idx].clone()).unwrap_or_default();
                let extra: Extra = columns
                    .iter()
                    .zip(row)
                    .enumerate()
                    .filter(|(idx, _)| Some(*idx) != id_idx)
                    .map(|(_, (column, value))| (column.clone(), Value::String(value)))
                    .collect();
                ListItem { id, label, extra }
            })
            .collect();

        Ok(ListPage {
            rows: items,
            total_count: total_rows.max(0) as u64,
        })
    }
}

#[async_trait]
impl ListSource<ListItem> for SqliteListSource {
    async fn fetch(&self, request: ListRequest) -> Result<ListPage<ListItem>, SourceError> {
        let source = self.clone();
        run_blocking(move || source.load(&request))
            .await?
            .map_err(|err| SourceError::Api(format!("{err:#}")))
    }
}
