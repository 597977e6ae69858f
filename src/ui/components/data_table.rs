use dioxus::prelude::*;

use crate::domain::entities::table::{RowId, SortOrder};
use crate::usecase::services::presentation::{HeaderCell, TableBody, TableView};

const TABLE_STYLE: &str = "border-collapse: collapse; width: 100%; table-layout: fixed;";
const CELL_STYLE: &str =
    "border: 1px solid #ddd; padding: 4px 8px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap;";

fn header_style(header: &HeaderCell) -> String {
    let mut style = format!(
        "{CELL_STYLE} background: #f4f4f4; text-align: left; cursor: {};",
        if header.sortable { "pointer" } else { "default" }
    );
    if let Some(width) = &header.width {
        style.push_str(&format!(" width: {width};"));
    }
    if let Some(min_width) = &header.min_width {
        style.push_str(&format!(" min-width: {min_width};"));
    }
    if let Some(max_width) = &header.max_width {
        style.push_str(&format!(" max-width: {max_width};"));
    }
    style
}

fn sort_marker(sorted: Option<SortOrder>) -> &'static str {
    match sorted {
        Some(SortOrder::Asc) => " ▲",
        Some(SortOrder::Desc) => " ▼",
        None => "",
    }
}

#[component]
pub fn DataTable(
    view: TableView,
    search_placeholder: String,
    on_search: EventHandler<String>,
    on_sort: EventHandler<String>,
    on_page: EventHandler<usize>,
    on_page_size: EventHandler<usize>,
    on_toggle_row: EventHandler<RowId>,
) -> Element {
    let column_span = view.headers.len() + 1;
    let pagination = view.pagination.clone();
    let current_page = pagination.page_index;

    let body = match &view.body {
        TableBody::AccessDenied => rsx! {
            tr { td { colspan: "{column_span}", style: CELL_STYLE, "Anda tidak memiliki akses ke data ini." } }
        },
        TableBody::Loading => rsx! {
            tr { td { colspan: "{column_span}", style: CELL_STYLE, "Memuat data..." } }
        },
        TableBody::Unauthenticated => rsx! {
            tr { td { colspan: "{column_span}", style: CELL_STYLE, "Sesi berakhir, silakan masuk kembali." } }
        },
        TableBody::Failed(failure) => rsx! {
            tr { td { colspan: "{column_span}", style: CELL_STYLE, "Gagal memuat data: {failure}" } }
        },
        TableBody::Empty => rsx! {
            tr { td { colspan: "{column_span}", style: CELL_STYLE, "Tidak ada data." } }
        },
        TableBody::Rows(rows) => rsx! {
            for row in rows.iter().cloned() {
                tr {
                    key: "{row.id}",
                    style: if row.selected { "background: #eef5ff;" } else { "" },
                    td {
                        style: CELL_STYLE,
                        input {
                            r#type: "checkbox",
                            checked: row.selected,
                            onchange: {
                                let id = row.id.clone();
                                move |_| on_toggle_row.call(id.clone())
                            },
                        }
                    }
                    for cell in row.cells.iter() {
                        td { key: "{cell.column_id}", style: CELL_STYLE, "{cell.value}" }
                    }
                }
            }
        },
    };

    rsx! {
        div {
            div {
                style: "display: flex; gap: 8px; align-items: center; padding: 8px 0;",
                input {
                    r#type: "search",
                    placeholder: "{search_placeholder}",
                    disabled: !view.search_enabled,
                    value: "{view.search_text}",
                    oninput: move |event| on_search.call(event.value()),
                }
            }

            table {
                style: TABLE_STYLE,
                thead {
                    tr {
                        th { style: "{CELL_STYLE} width: 32px;" }
                        for header in view.headers.iter().cloned() {
                            th {
                                key: "{header.column_id}",
                                style: header_style(&header),
                                onclick: {
                                    let column_id = header.column_id.clone();
                                    let sortable = header.sortable;
                                    move |_| {
                                        if sortable {
                                            on_sort.call(column_id.clone());
                                        }
                                    }
                                },
                                "{header.label}{sort_marker(header.sorted)}"
                            }
                        }
                    }
                }
                tbody { {body} }
            }

            div {
                style: "display: flex; gap: 8px; align-items: center; padding: 8px 0; flex-wrap: wrap;",
                span {
                    "Menampilkan {pagination.showing_from}-{pagination.showing_to} dari {pagination.total}"
                }
                select {
                    value: "{pagination.page_size}",
                    onchange: move |event| {
                        if let Ok(size) = event.value().parse::<usize>() {
                            on_page_size.call(size);
                        }
                    },
                    for size in pagination.page_size_options.iter().copied() {
                        option { key: "{size}", value: "{size}", "{size} / halaman" }
                    }
                }
                button {
                    disabled: !pagination.can_previous,
                    onclick: move |_| on_page.call(current_page.saturating_sub(1)),
                    "‹"
                }
                for index in pagination.page_window.clone() {
                    button {
                        key: "{index}",
                        disabled: index == current_page,
                        onclick: move |_| on_page.call(index),
                        "{index + 1}"
                    }
                }
                button {
                    disabled: !pagination.can_next,
                    onclick: move |_| on_page.call(current_page + 1),
                    "›"
                }
            }
        }
    }
}
