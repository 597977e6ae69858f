use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::entities::query::{FetchFailure, FetchResult, RemoteQueryDescriptor};
use crate::usecase::ports::source::{
    CredentialProvider, ListRequest, ListSource, Notice, NoticeLevel, NotificationSink,
};

/// Sends descriptors to a list source and keeps the latest authoritative
/// outcome. Only the response to the most recent submission is applied.
pub struct DataFetchBinding<T> {
    source: Arc<dyn ListSource<T>>,
    credentials: Arc<dyn CredentialProvider>,
    notifier: Option<Arc<dyn NotificationSink>>,
    generation: Arc<AtomicU64>,
    current: Mutex<Option<RemoteQueryDescriptor>>,
    state: Arc<watch::Sender<FetchResult<T>>>,
}

impl<T> DataFetchBinding<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn ListSource<T>>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let (state, _) = watch::channel(FetchResult::default());
        Self {
            source,
            credentials,
            notifier: None,
            generation: Arc::new(AtomicU64::new(0)),
            current: Mutex::new(None),
            state: Arc::new(state),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn snapshot(&self) -> FetchResult<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchResult<T>> {
        self.state.subscribe()
    }

    /// Descriptor of the latest submission, if any.
    pub fn current_descriptor(&self) -> Option<RemoteQueryDescriptor> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Issues `descriptor` and marks the result as loading. Any response still
    /// outstanding for an earlier submission is discarded on arrival.
    pub fn submit(&self, descriptor: RemoteQueryDescriptor) -> JoinHandle<()> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(descriptor.clone());
        self.state.send_modify(|result| result.is_loading = true);
        debug!(
            generation = ticket,
            page = descriptor.page,
            size = descriptor.size,
            keyword = ?descriptor.keyword,
            sort_by = ?descriptor.sort_by,
            "submitting list request"
        );

        let request = ListRequest {
            descriptor,
            bearer: self.credentials.token(),
        };
        let source = Arc::clone(&self.source);
        let generation = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            let outcome = source.fetch(request).await.map_err(FetchFailure::from);
            let failure = outcome.as_ref().err().cloned();

            let applied = state.send_if_modified(|result| {
                if generation.load(Ordering::SeqCst) != ticket {
                    return false;
                }
                match outcome {
                    Ok(page) => {
                        result.rows = page.rows;
                        result.total_count = page.total_count;
                        result.error = None;
                    }
                    Err(failure) => {
                        result.rows = Vec::new();
                        result.total_count = 0;
                        result.error = Some(failure);
                    }
                }
                result.is_loading = false;
                true
            });

            if !applied {
                debug!(generation = ticket, "discarding stale list response");
                return;
            }
            if let Some(failure) = failure {
                warn!(generation = ticket, error = %failure, "list request failed");
                if failure == FetchFailure::Forbidden {
                    return;
                }
                if let Some(notifier) = notifier.as_ref() {
                    notifier.notify(Notice {
                        level: NoticeLevel::Error,
                        title: "Gagal memuat data".to_string(),
                        message: failure.to_string(),
                    });
                }
            }
        })
    }

    /// Re-issues the latest descriptor, e.g. after a row was deleted.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        self.current_descriptor()
            .map(|descriptor| self.submit(descriptor))
    }
}
