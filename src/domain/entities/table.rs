use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

pub const PAGE_SIZE_OPTIONS: [usize; 5] = [10, 20, 30, 40, 50];
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(size) => size,
    None => unreachable!(),
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub String);

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        RowId(value)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationState {
    pub page_index: usize,
    pub page_size: NonZeroUsize,
}

impl PaginationState {
    pub fn new(page_index: usize, page_size: NonZeroUsize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Offset of the first row on this page.
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size.get())
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub column_id: String,
    pub descending: bool,
}

impl SortDescriptor {
    pub fn asc(column_id: impl Into<String>) -> Self {
        Self {
            column_id: column_id.into(),
            descending: false,
        }
    }

    pub fn desc(column_id: impl Into<String>) -> Self {
        Self {
            column_id: column_id.into(),
            descending: true,
        }
    }

    pub fn order(&self) -> SortOrder {
        if self.descending {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    pub column_id: String,
    pub value: String,
}

impl FilterState {
    /// Filter text with surrounding whitespace removed, `None` when blank.
    pub fn keyword(&self) -> Option<&str> {
        let trimmed = self.value.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

pub type RowSelection = BTreeSet<RowId>;

pub type ColumnVisibility = BTreeMap<String, bool>;

/// Snapshot of every interactive control of one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableState {
    pub pagination: PaginationState,
    pub sort: Option<SortDescriptor>,
    pub filter: Option<FilterState>,
    pub selection: RowSelection,
    pub column_visibility: ColumnVisibility,
    pub row_count: Option<u64>,
}

impl TableState {
    pub fn is_column_visible(&self, column_id: &str) -> bool {
        self.column_visibility
            .get(column_id)
            .copied()
            .unwrap_or(true)
    }

    pub fn filter_text(&self) -> &str {
        self.filter
            .as_ref()
            .map(|filter| filter.value.as_str())
            .unwrap_or("")
    }
}
