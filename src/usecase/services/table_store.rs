use std::num::NonZeroUsize;

use crate::domain::entities::table::{
    FilterState, PaginationState, RowId, RowSelection, SortDescriptor, TableState,
};

/// Single source of truth for the interactive controls of one table.
///
/// Every mutation bumps [`TableStateStore::revision`], which view layers use
/// to detect that a re-render (and usually a new request) is due.
#[derive(Debug, Clone)]
pub struct TableStateStore {
    state: TableState,
    search_column: String,
    revision: u64,
}

impl TableStateStore {
    pub fn new(search_column: impl Into<String>, page_size: NonZeroUsize) -> Self {
        Self {
            state: TableState {
                pagination: PaginationState::new(0, page_size),
                ..TableState::default()
            },
            search_column: search_column.into(),
            revision: 0,
        }
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn pagination(&self) -> PaginationState {
        self.state.pagination
    }

    pub fn sort(&self) -> Option<&SortDescriptor> {
        self.state.sort.as_ref()
    }

    pub fn filter(&self) -> Option<&FilterState> {
        self.state.filter.as_ref()
    }

    pub fn selection(&self) -> &RowSelection {
        &self.state.selection
    }

    pub fn search_column(&self) -> &str {
        &self.search_column
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn row_count(&self) -> Option<u64> {
        self.state.row_count
    }

    /// Number of pages for the last observed row count, 0 when nothing has
    /// been observed yet or the result set is empty.
    pub fn page_count(&self) -> usize {
        match self.state.row_count {
            Some(total) => page_count(total, self.state.pagination.page_size),
            None => 0,
        }
    }

    pub fn can_previous_page(&self) -> bool {
        self.state.pagination.page_index > 0
    }

    pub fn can_next_page(&self) -> bool {
        self.state.pagination.page_index + 1 < self.page_count()
    }

    pub fn set_pagination(&mut self, next: PaginationState) {
        self.state.pagination = self.clamped(next);
        self.touch();
    }

    pub fn set_page_index(&mut self, page_index: usize) {
        let next = PaginationState {
            page_index,
            ..self.state.pagination
        };
        self.set_pagination(next);
    }

    pub fn next_page(&mut self) {
        if self.can_next_page() {
            self.set_page_index(self.state.pagination.page_index + 1);
        }
    }

    pub fn previous_page(&mut self) {
        if self.can_previous_page() {
            self.set_page_index(self.state.pagination.page_index - 1);
        }
    }

    /// Changes the page size while keeping the first visible row on screen.
    pub fn set_page_size(&mut self, page_size: NonZeroUsize) {
        let first_row = self.state.pagination.offset();
        self.set_pagination(PaginationState::new(first_row / page_size.get(), page_size));
    }

    pub fn set_sort(&mut self, next: Option<SortDescriptor>) {
        self.state.sort = next;
        self.touch();
    }

    /// Header-click cycle: unsorted -> ascending -> descending -> unsorted.
    /// Clicking a different column starts it ascending.
    pub fn toggle_sort(&mut self, column_id: &str) {
        let next = match self.state.sort.as_ref() {
            Some(current) if current.column_id == column_id && !current.descending => {
                Some(SortDescriptor::desc(column_id))
            }
            Some(current) if current.column_id == column_id => None,
            _ => Some(SortDescriptor::asc(column_id)),
        };
        self.set_sort(next);
    }

    /// Replaces the search text and returns to the first page, since old page
    /// offsets mean nothing for a different result set.
    pub fn set_filter(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.state.filter = if value.is_empty() {
            None
        } else {
            Some(FilterState {
                column_id: self.search_column.clone(),
                value,
            })
        };
        let page_size = self.state.pagination.page_size;
        self.set_pagination(PaginationState::new(0, page_size));
    }

    pub fn set_selection(&mut self, ids: RowSelection) {
        self.state.selection = ids;
        self.touch();
    }

    pub fn toggle_row(&mut self, id: RowId) {
        if !self.state.selection.remove(&id) {
            self.state.selection.insert(id);
        }
        self.touch();
    }

    /// Drops selected ids that are not on the rendered page.
    pub fn prune_selection<'a, I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = &'a RowId>,
    {
        let visible: RowSelection = visible.into_iter().cloned().collect();
        let before = self.state.selection.len();
        self.state.selection.retain(|id| visible.contains(id));
        if self.state.selection.len() != before {
            self.touch();
        }
    }

    pub fn set_column_visibility(&mut self, column_id: impl Into<String>, visible: bool) {
        self.state.column_visibility.insert(column_id.into(), visible);
        self.touch();
    }

    /// Records the backend's total and clamps the page index into range.
    /// Returns `true` when the page index had to move.
    pub fn observe_row_count(&mut self, total: u64) -> bool {
        let before = self.state.pagination.page_index;
        let known = self.state.row_count.replace(total);
        self.state.pagination = self.clamped(self.state.pagination);
        let moved = self.state.pagination.page_index != before;
        if moved || known != Some(total) {
            self.touch();
        }
        moved
    }

    fn clamped(&self, next: PaginationState) -> PaginationState {
        let Some(total) = self.state.row_count else {
            return next;
        };
        let last_page = page_count(total, next.page_size).saturating_sub(1);
        PaginationState {
            page_index: next.page_index.min(last_page),
            ..next
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

fn page_count(total: u64, page_size: NonZeroUsize) -> usize {
    let size = page_size.get() as u64;
    usize::try_from(total.div_ceil(size)).unwrap_or(usize::MAX)
}
