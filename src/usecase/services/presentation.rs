use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::domain::entities::item::TableRow;
use crate::domain::entities::query::{FetchFailure, FetchResult};
use crate::domain::entities::table::{RowId, SortOrder, TableState, PAGE_SIZE_OPTIONS};

pub type CellRenderer<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Caller-supplied column metadata. Read-only to this module.
#[derive(Clone)]
pub struct ColumnDef<T> {
    pub id: String,
    pub header: String,
    pub width: Option<String>,
    pub min_width: Option<String>,
    pub max_width: Option<String>,
    pub sortable: bool,
    pub cell: Option<CellRenderer<T>>,
}

impl<T> ColumnDef<T> {
    pub fn new(id: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            header: header.into(),
            width: None,
            min_width: None,
            max_width: None,
            sortable: true,
            cell: None,
        }
    }

    pub fn width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn min_width(mut self, min_width: impl Into<String>) -> Self {
        self.min_width = Some(min_width.into());
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn cell<F>(mut self, render: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.cell = Some(Arc::new(render));
        self
    }
}

impl<T> fmt::Debug for ColumnDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("width", &self.width)
            .field("sortable", &self.sortable)
            .field("cell", &self.cell.as_ref().map(|_| "<renderer>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub column_id: String,
    pub label: String,
    pub width: Option<String>,
    pub min_width: Option<String>,
    pub max_width: Option<String>,
    pub sortable: bool,
    pub sorted: Option<SortOrder>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCell {
    pub column_id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: RowId,
    pub selected: bool,
    pub cells: Vec<RenderedCell>,
}

/// Which body the view should draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBody {
    AccessDenied,
    Loading,
    Unauthenticated,
    Failed(FetchFailure),
    Empty,
    Rows(Vec<RenderedRow>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSummary {
    /// 1-based number of the first row shown, 0 when the page is empty.
    pub showing_from: u64,
    pub showing_to: u64,
    pub total: u64,
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub page_size_options: Vec<usize>,
    /// Page indices to draw as numbered buttons.
    pub page_window: Range<usize>,
    pub can_previous: bool,
    pub can_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub headers: Vec<HeaderCell>,
    pub body: TableBody,
    pub pagination: PaginationSummary,
    pub search_enabled: bool,
    pub search_text: String,
}

pub fn render<T: TableRow>(
    columns: &[ColumnDef<T>],
    result: &FetchResult<T>,
    state: &TableState,
) -> TableView {
    let visible: Vec<&ColumnDef<T>> = columns
        .iter()
        .filter(|column| state.is_column_visible(&column.id))
        .collect();

    let headers = visible
        .iter()
        .map(|column| HeaderCell {
            column_id: column.id.clone(),
            label: column.header.clone(),
            width: column.width.clone(),
            min_width: column.min_width.clone(),
            max_width: column.max_width.clone(),
            sortable: column.sortable,
            sorted: state
                .sort
                .as_ref()
                .filter(|sort| sort.column_id == column.id)
                .map(|sort| sort.order()),
        })
        .collect();

    TableView {
        headers,
        body: body(&visible, result, state),
        pagination: summarize(result, state),
        search_enabled: !result.is_loading && !result.is_forbidden(),
        search_text: state.filter_text().to_string(),
    }
}

fn body<T: TableRow>(
    columns: &[&ColumnDef<T>],
    result: &FetchResult<T>,
    state: &TableState,
) -> TableBody {
    match &result.error {
        Some(FetchFailure::Forbidden) => return TableBody::AccessDenied,
        _ if result.is_loading => return TableBody::Loading,
        Some(FetchFailure::Unauthenticated) => return TableBody::Unauthenticated,
        Some(other) => return TableBody::Failed(other.clone()),
        None => {}
    }
    if result.rows.is_empty() {
        return TableBody::Empty;
    }

    let rows = result
        .rows
        .iter()
        .map(|row| {
            let id = row.row_id();
            RenderedRow {
                selected: state.selection.contains(&id),
                id,
                cells: columns
                    .iter()
                    .map(|column| RenderedCell {
                        column_id: column.id.clone(),
                        value: match &column.cell {
                            Some(render) => render(row),
                            None => row.field(&column.id).unwrap_or_default(),
                        },
                    })
                    .collect(),
            }
        })
        .collect();
    TableBody::Rows(rows)
}

pub fn summarize<T>(result: &FetchResult<T>, state: &TableState) -> PaginationSummary {
    let pagination = state.pagination;
    let page_size = pagination.page_size.get();
    let shown = result.rows.len() as u64;
    let offset = pagination.offset() as u64;
    let total = if result.total_count > 0 {
        result.total_count
    } else {
        shown
    };
    let page_count = usize::try_from(total.div_ceil(page_size as u64)).unwrap_or(usize::MAX);
    let page_index = pagination.page_index;

    PaginationSummary {
        showing_from: if shown == 0 { 0 } else { offset + 1 },
        showing_to: if shown == 0 { 0 } else { offset + shown },
        total,
        page_index,
        page_size,
        page_count,
        page_size_options: PAGE_SIZE_OPTIONS.to_vec(),
        page_window: page_window(page_index, page_count),
        can_previous: page_index > 0,
        can_next: page_index + 1 < page_count,
    }
}

/// One page before the current one and up to three after it.
pub fn page_window(page_index: usize, page_count: usize) -> Range<usize> {
    let start = page_index.saturating_sub(1);
    let end = page_count.min(page_index.saturating_add(4));
    start.min(end)..end
}
