use std::num::NonZeroUsize;

use thiserror::Error;

use crate::domain::entities::query::RemoteQueryDescriptor;
use crate::domain::entities::table::{FilterState, PaginationState, SortDescriptor, SortOrder};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("page must be 1 or greater")]
    ZeroPage,
    #[error("size must be 1 or greater")]
    ZeroSize,
    #[error("invalid value for `{key}`: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("missing `{0}`")]
    Missing(&'static str),
}

/// Maps table state to list-endpoint parameters and back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryCodec {
    pub search_column: Option<String>,
    pub default_sort: Option<SortDescriptor>,
}

impl QueryCodec {
    pub fn new(search_column: Option<String>, default_sort: Option<SortDescriptor>) -> Self {
        Self {
            search_column,
            default_sort,
        }
    }

    pub fn encode(
        &self,
        pagination: &PaginationState,
        sort: Option<&SortDescriptor>,
        filter: Option<&FilterState>,
    ) -> RemoteQueryDescriptor {
        let sort = sort.or(self.default_sort.as_ref());
        RemoteQueryDescriptor {
            page: pagination.page_index + 1,
            size: pagination.page_size.get(),
            keyword: filter.and_then(FilterState::keyword).map(str::to_string),
            sort_by: sort.map(|sort| sort.column_id.clone()),
            sort_order: sort.map(SortDescriptor::order),
        }
    }

    /// Inverse of [`QueryCodec::encode`]. A sort in the descriptor is always
    /// returned, even when it is the default one. The filter is bound to
    /// `search_column`.
    pub fn decode(
        &self,
        descriptor: &RemoteQueryDescriptor,
    ) -> Result<(PaginationState, Option<SortDescriptor>, Option<FilterState>), CodecError> {
        if descriptor.page == 0 {
            return Err(CodecError::ZeroPage);
        }
        let page_size = NonZeroUsize::new(descriptor.size).ok_or(CodecError::ZeroSize)?;
        let pagination = PaginationState::new(descriptor.page - 1, page_size);

        let sort = descriptor.sort_by.as_ref().map(|column_id| SortDescriptor {
            column_id: column_id.clone(),
            descending: matches!(descriptor.sort_order, Some(SortOrder::Desc)),
        });

        let filter = match (&self.search_column, &descriptor.keyword) {
            (Some(column_id), Some(keyword)) if !keyword.trim().is_empty() => Some(FilterState {
                column_id: column_id.clone(),
                value: keyword.clone(),
            }),
            _ => None,
        };

        Ok((pagination, sort, filter))
    }
}

/// Query-string pairs in the order list endpoints document them.
pub fn to_query_pairs(descriptor: &RemoteQueryDescriptor) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("page", descriptor.page.to_string()),
        ("size", descriptor.size.to_string()),
    ];
    if let Some(keyword) = &descriptor.keyword {
        pairs.push(("keyword", keyword.clone()));
    }
    if let Some(sort_by) = &descriptor.sort_by {
        pairs.push(("sort_by", sort_by.clone()));
    }
    if let Some(sort_order) = descriptor.sort_order {
        pairs.push(("sort_order", sort_order.as_str().to_string()));
    }
    pairs
}

/// Rebuilds a descriptor from decoded query-string pairs. Unknown keys are
/// ignored so route search strings may carry other parameters.
pub fn from_query_pairs<'a, I>(pairs: I) -> Result<RemoteQueryDescriptor, CodecError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut page = None;
    let mut size = None;
    let mut keyword = None;
    let mut sort_by = None;
    let mut sort_order = None;

    for (key, value) in pairs {
        match key {
            "page" => page = Some(parse_count("page", value)?),
            "size" => size = Some(parse_count("size", value)?),
            "keyword" if !value.is_empty() => keyword = Some(value.to_string()),
            "sort_by" if !value.is_empty() => sort_by = Some(value.to_string()),
            "sort_order" => {
                sort_order = Some(SortOrder::parse(value).ok_or_else(|| {
                    CodecError::InvalidValue {
                        key: "sort_order",
                        value: value.to_string(),
                    }
                })?)
            }
            _ => {}
        }
    }

    let page = page.ok_or(CodecError::Missing("page"))?;
    let size = size.ok_or(CodecError::Missing("size"))?;
    if page == 0 {
        return Err(CodecError::ZeroPage);
    }
    if size == 0 {
        return Err(CodecError::ZeroSize);
    }
    if sort_by.is_none() {
        sort_order = None;
    }

    Ok(RemoteQueryDescriptor {
        page,
        size,
        keyword,
        sort_by,
        sort_order,
    })
}

fn parse_count(key: &'static str, value: &str) -> Result<usize, CodecError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| CodecError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
