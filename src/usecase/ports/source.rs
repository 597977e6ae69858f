use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::query::{FetchFailure, RemoteQueryDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("backend error: {0}")]
    Api(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<SourceError> for FetchFailure {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Http { status, .. } => FetchFailure::from_status(status),
            SourceError::Api(message) => FetchFailure::Api(message),
            SourceError::Transport(message) => FetchFailure::Transport(message),
            SourceError::Decode(message) => FetchFailure::Decode(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub descriptor: RemoteQueryDescriptor,
    pub bearer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub rows: Vec<T>,
    pub total_count: u64,
}

/// A remote (or local) list endpoint.
#[async_trait]
pub trait ListSource<T>: Send + Sync {
    async fn fetch(&self, request: ListRequest) -> Result<ListPage<T>, SourceError>;
}

pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Option<String>);

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

/// Toast collaborator for transient errors.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(title = %notice.title, "{}", notice.message),
            NoticeLevel::Warning => tracing::warn!(title = %notice.title, "{}", notice.message),
            NoticeLevel::Error => tracing::error!(title = %notice.title, "{}", notice.message),
        }
    }
}
