use crate::usecase::ports::source::SourceError;

pub async fn run_blocking<F, T>(f: F) -> Result<T, SourceError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| SourceError::Transport(format!("blocking task failed: {err}")))
}
