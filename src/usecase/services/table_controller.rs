use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::entities::item::TableRow;
use crate::domain::entities::query::{FetchResult, RemoteQueryDescriptor};
use crate::domain::entities::table::{PaginationState, RowId, RowSelection, SortDescriptor};
use crate::usecase::services::fetch_binding::DataFetchBinding;
use crate::usecase::services::query_codec::QueryCodec;
use crate::usecase::services::table_store::TableStateStore;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    pub search_column: String,
    pub page_size: NonZeroUsize,
    pub default_sort: Option<SortDescriptor>,
    pub debounce: Duration,
}

impl TableOptions {
    pub fn new(search_column: impl Into<String>) -> Self {
        Self {
            search_column: search_column.into(),
            page_size: crate::domain::entities::table::DEFAULT_PAGE_SIZE,
            default_sort: None,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Wires user interactions to the store, the codec and the fetch binding.
///
/// Pagination and sort changes fetch right away. Filter text is debounced so
/// a burst of keystrokes produces one request for the final text.
pub struct RemoteTableController<T> {
    store: TableStateStore,
    codec: QueryCodec,
    binding: Arc<DataFetchBinding<T>>,
    debounce: Duration,
    pending_filter: Option<JoinHandle<()>>,
    epoch: Arc<Mutex<u64>>,
}

impl<T> RemoteTableController<T>
where
    T: TableRow + Clone + Send + Sync + 'static,
{
    pub fn new(binding: Arc<DataFetchBinding<T>>, options: TableOptions) -> Self {
        let codec = QueryCodec::new(Some(options.search_column.clone()), options.default_sort);
        Self {
            store: TableStateStore::new(options.search_column, options.page_size),
            codec,
            binding,
            debounce: options.debounce,
            pending_filter: None,
            epoch: Arc::new(Mutex::new(0)),
        }
    }

    pub fn store(&self) -> &TableStateStore {
        &self.store
    }

    pub fn binding(&self) -> &Arc<DataFetchBinding<T>> {
        &self.binding
    }

    pub fn result(&self) -> FetchResult<T> {
        self.binding.snapshot()
    }

    pub fn descriptor(&self) -> RemoteQueryDescriptor {
        self.codec.encode(
            &self.store.pagination(),
            self.store.sort(),
            self.store.filter(),
        )
    }

    pub fn has_pending_filter(&self) -> bool {
        self.pending_filter
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// First load of the table.
    pub fn start(&mut self) -> JoinHandle<()> {
        self.fetch_now()
    }

    pub fn refresh(&mut self) -> JoinHandle<()> {
        self.fetch_now()
    }

    pub fn set_pagination(&mut self, next: PaginationState) -> JoinHandle<()> {
        self.store.set_pagination(next);
        self.fetch_now()
    }

    pub fn set_page_index(&mut self, page_index: usize) -> JoinHandle<()> {
        self.store.set_page_index(page_index);
        self.fetch_now()
    }

    pub fn set_page_size(&mut self, page_size: NonZeroUsize) -> JoinHandle<()> {
        self.store.set_page_size(page_size);
        self.fetch_now()
    }

    pub fn next_page(&mut self) -> Option<JoinHandle<()>> {
        let before = self.store.pagination();
        self.store.next_page();
        (self.store.pagination() != before).then(|| self.fetch_now())
    }

    pub fn previous_page(&mut self) -> Option<JoinHandle<()>> {
        let before = self.store.pagination();
        self.store.previous_page();
        (self.store.pagination() != before).then(|| self.fetch_now())
    }

    pub fn set_sort(&mut self, next: Option<SortDescriptor>) -> JoinHandle<()> {
        self.store.set_sort(next);
        self.fetch_now()
    }

    pub fn toggle_sort(&mut self, column_id: &str) -> JoinHandle<()> {
        self.store.toggle_sort(column_id);
        self.fetch_now()
    }

    /// Updates the search text immediately and schedules the request after
    /// the debounce window. A newer keystroke replaces the scheduled request.
    pub fn set_filter(&mut self, value: impl Into<String>) {
        self.store.set_filter(value);
        self.cancel_pending_filter();

        let ticket = {
            let mut epoch = self.epoch.lock().unwrap_or_else(PoisonError::into_inner);
            *epoch += 1;
            *epoch
        };
        let descriptor = self.descriptor();
        let binding = Arc::clone(&self.binding);
        let epoch = Arc::clone(&self.epoch);
        let debounce = self.debounce;
        self.pending_filter = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Aborting this task must not cancel the submitted fetch.
            drop(submit_if_current(&binding, &epoch, ticket, descriptor));
        }));
    }

    pub fn set_selection(&mut self, ids: RowSelection) {
        self.store.set_selection(ids);
    }

    pub fn toggle_row(&mut self, id: RowId) {
        self.store.toggle_row(id);
    }

    pub fn set_column_visibility(&mut self, column_id: impl Into<String>, visible: bool) {
        self.store.set_column_visibility(column_id, visible);
    }

    /// Folds the latest settled result back into the store: records the row
    /// count, clamps the page and prunes the selection to the rendered rows.
    /// When clamping moved the page, the corrected page is requested and its
    /// handle returned.
    pub fn reconcile(&mut self) -> Option<JoinHandle<()>> {
        let result = self.binding.snapshot();
        if !result.is_settled() {
            return None;
        }
        let visible: Vec<RowId> = result.rows.iter().map(TableRow::row_id).collect();
        self.store.prune_selection(visible.iter());

        if result.error.is_some() {
            return None;
        }
        if self.store.observe_row_count(result.total_count) {
            debug!(
                page_index = self.store.pagination().page_index,
                total = result.total_count,
                "page index clamped after row count change"
            );
            return Some(self.fetch_now());
        }
        None
    }

    fn fetch_now(&mut self) -> JoinHandle<()> {
        self.cancel_pending_filter();
        let descriptor = self.descriptor();
        let mut epoch = self.epoch.lock().unwrap_or_else(PoisonError::into_inner);
        *epoch += 1;
        self.binding.submit(descriptor)
    }

    fn cancel_pending_filter(&mut self) {
        if let Some(handle) = self.pending_filter.take() {
            handle.abort();
        }
    }
}

/// Submits a debounced filter request unless another fetch or keystroke has
/// taken a newer ticket since this one was issued. `abort` cannot stop a
/// task that is already in its final poll on another worker, so the check
/// and the submission happen under the same lock as immediate fetches.
pub(crate) fn submit_if_current<T>(
    binding: &DataFetchBinding<T>,
    epoch: &Mutex<u64>,
    ticket: u64,
    descriptor: RemoteQueryDescriptor,
) -> Option<JoinHandle<()>>
where
    T: Clone + Send + Sync + 'static,
{
    let epoch = epoch.lock().unwrap_or_else(PoisonError::into_inner);
    if *epoch != ticket {
        debug!(ticket, "debounced filter superseded");
        return None;
    }
    debug!(keyword = ?descriptor.keyword, "debounced filter fired");
    Some(binding.submit(descriptor))
}

impl<T> Drop for RemoteTableController<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending_filter.take() {
            handle.abort();
        }
    }
}
