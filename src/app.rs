use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use dioxus::prelude::*;
use reqwest::Url;
use tracing::warn;

use crate::config::AppConfig;
use crate::domain::entities::item::{value_to_cell, ListItem};
use crate::domain::entities::table::{RowId, SortDescriptor};
use crate::infra::http::rest_source::RestListSource;
use crate::infra::import::sample::WATER_LEVEL_COLLECTION;
use crate::infra::sqlite::repo::SqliteListSource;
use crate::ui::components::data_table::DataTable;
use crate::ui::state::table_state::{use_remote_table, RemoteTable};
use crate::usecase::ports::source::{
    ListPage, ListRequest, ListSource, SourceError, StaticCredentials, TracingNotifier,
};
use crate::usecase::services::fetch_binding::DataFetchBinding;
use crate::usecase::services::presentation::ColumnDef;
use crate::usecase::services::table_controller::{RemoteTableController, TableOptions};

const SEARCH_COLUMN: &str = "station";
const REMOTE_PATH: &str = "water-levels";
const REMOTE_ROWS_KEY: &str = "water_levels";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SourceKind {
    Local,
    Remote,
}

struct UnavailableSource(SourceError);

#[async_trait]
impl ListSource<ListItem> for UnavailableSource {
    async fn fetch(&self, _request: ListRequest) -> Result<ListPage<ListItem>, SourceError> {
        Err(self.0.clone())
    }
}

pub fn water_level_columns() -> Vec<ColumnDef<ListItem>> {
    vec![
        ColumnDef::new("id", "ID").width("120px").unsortable(),
        ColumnDef::new("station", "Pos Pantau").min_width("160px"),
        ColumnDef::new("river", "Sungai").min_width("120px"),
        ColumnDef::new("level_cm", "TMA (cm)")
            .width("100px")
            .cell(|item: &ListItem| {
                item.extra
                    .get("level_cm")
                    .map(value_to_cell)
                    .unwrap_or_else(|| "-".to_string())
            }),
        ColumnDef::new("status", "Status").width("100px"),
        ColumnDef::new("recorded_at", "Waktu").width("180px"),
    ]
}

fn local_source(config: &AppConfig) -> Arc<dyn ListSource<ListItem>> {
    Arc::new(SqliteListSource::new(
        config.db_path.clone(),
        WATER_LEVEL_COLLECTION,
        Some(SEARCH_COLUMN.to_string()),
    ))
}

fn remote_source(config: &AppConfig) -> Arc<dyn ListSource<ListItem>> {
    let built = Url::parse(&config.api_base_url)
        .map_err(|err| SourceError::Transport(format!("invalid api_base_url: {err}")))
        .and_then(|base| RestListSource::<ListItem>::new(&base, REMOTE_PATH, REMOTE_ROWS_KEY));
    match built {
        Ok(source) => Arc::new(source),
        Err(err) => {
            warn!(api_base_url = %config.api_base_url, error = %err, "remote list source unavailable");
            Arc::new(UnavailableSource(err))
        }
    }
}

pub fn water_level_controller(
    config: &AppConfig,
    source: Arc<dyn ListSource<ListItem>>,
) -> RemoteTableController<ListItem> {
    let credentials = Arc::new(StaticCredentials(config.api_token.clone()));
    let binding = DataFetchBinding::new(source, credentials).with_notifier(Arc::new(TracingNotifier));

    let mut options = TableOptions::new(SEARCH_COLUMN);
    options.page_size = config.default_page_size;
    options.debounce = config.debounce;
    options.default_sort = Some(SortDescriptor::desc("recorded_at"));

    RemoteTableController::new(Arc::new(binding), options)
}

fn water_level_table(mut table: RemoteTable<ListItem>, columns: &[ColumnDef<ListItem>]) -> Element {
    let view = table.view(columns);
    let selected = table.controller.read().store().selection().len();

    rsx! {
        div {
            style: "display: flex; gap: 12px; align-items: center;",
            button {
                onclick: move |_| table.update(|controller| drop(controller.refresh())),
                "Muat ulang"
            }
            span { "{selected} baris dipilih" }
        }

        DataTable {
            view,
            search_placeholder: "Cari pos pantau...".to_string(),
            on_search: move |text: String| table.update(|controller| controller.set_filter(text)),
            on_sort: move |column_id: String| {
                table.update(|controller| drop(controller.toggle_sort(&column_id)))
            },
            on_page: move |page_index: usize| {
                table.update(|controller| drop(controller.set_page_index(page_index)))
            },
            on_page_size: move |size: usize| {
                if let Some(size) = NonZeroUsize::new(size) {
                    table.update(|controller| drop(controller.set_page_size(size)));
                }
            },
            on_toggle_row: move |id: RowId| table.update(|controller| controller.toggle_row(id)),
        }
    }
}

#[component]
fn LocalWaterLevels() -> Element {
    let config = use_context::<AppConfig>();
    let columns = use_hook(water_level_columns);
    let table = use_remote_table(move || {
        let source = local_source(&config);
        water_level_controller(&config, source)
    });
    water_level_table(table, &columns)
}

#[component]
fn RemoteWaterLevels() -> Element {
    let config = use_context::<AppConfig>();
    let columns = use_hook(water_level_columns);
    let table = use_remote_table(move || {
        let source = remote_source(&config);
        water_level_controller(&config, source)
    });
    water_level_table(table, &columns)
}

#[component]
pub fn App() -> Element {
    let mut source = use_signal(|| SourceKind::Local);

    rsx! {
        div {
            style: "font-family: sans-serif; padding: 12px;",
            nav {
                style: "display: flex; gap: 12px; align-items: center; padding: 8px 0;",
                strong { "Tinggi Muka Air" }
                button {
                    disabled: source() == SourceKind::Local,
                    onclick: move |_| source.set(SourceKind::Local),
                    "Data lokal"
                }
                button {
                    disabled: source() == SourceKind::Remote,
                    onclick: move |_| source.set(SourceKind::Remote),
                    "API"
                }
            }

            match source() {
                SourceKind::Local => rsx! { LocalWaterLevels {} },
                SourceKind::Remote => rsx! { RemoteWaterLevels {} },
            }
        }
    }
}
