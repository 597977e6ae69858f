use serde::{Deserialize, Serialize};

use crate::domain::entities::table::SortOrder;

/// Wire-ready parameters for a backend list endpoint. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteQueryDescriptor {
    pub page: usize,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

impl RemoteQueryDescriptor {
    /// Row offset implied by `page` and `size`.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// 401 from the list endpoint; the embedding router decides what to do.
    Unauthenticated,
    /// 403; rendered as an access-denied placeholder.
    Forbidden,
    Http(u16),
    Api(String),
    Transport(String),
    Decode(String),
}

impl FetchFailure {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => FetchFailure::Unauthenticated,
            403 => FetchFailure::Forbidden,
            other => FetchFailure::Http(other),
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            FetchFailure::Unauthenticated => Some(401),
            FetchFailure::Forbidden => Some(403),
            FetchFailure::Http(status) => Some(*status),
            FetchFailure::Api(_) | FetchFailure::Transport(_) | FetchFailure::Decode(_) => None,
        }
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchFailure::Unauthenticated => write!(f, "session expired (401)"),
            FetchFailure::Forbidden => write!(f, "access denied (403)"),
            FetchFailure::Http(status) => write!(f, "request failed with status {status}"),
            FetchFailure::Api(message) => write!(f, "backend reported an error: {message}"),
            FetchFailure::Transport(message) => write!(f, "network error: {message}"),
            FetchFailure::Decode(message) => write!(f, "unreadable response: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<T> {
    pub rows: Vec<T>,
    pub total_count: u64,
    pub is_loading: bool,
    pub error: Option<FetchFailure>,
}

impl<T> FetchResult<T> {
    pub fn error_code(&self) -> Option<u16> {
        self.error.as_ref().and_then(FetchFailure::code)
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self.error, Some(FetchFailure::Forbidden))
    }

    pub fn is_settled(&self) -> bool {
        !self.is_loading
    }
}

impl<T> Default for FetchResult<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            total_count: 0,
            is_loading: false,
            error: None,
        }
    }
}
