use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::infra::http::envelope::ListEnvelope;
use crate::usecase::ports::source::{ListPage, ListRequest, ListSource, SourceError};
use crate::usecase::services::query_codec::to_query_pairs;

/// `GET {base_url}/{path}` list endpoint of the dashboard backend.
#[derive(Debug, Clone)]
pub struct RestListSource<T> {
    http: Client,
    endpoint: Url,
    rows_key: String,
    _rows: PhantomData<fn() -> T>,
}

impl<T> RestListSource<T> {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: &Url, path: &str, rows_key: impl Into<String>) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("sihka-table/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| SourceError::Transport(err.to_string()))?;
        Ok(Self::with_client(http, endpoint_url(base_url, path)?, rows_key))
    }

    pub fn with_client(http: Client, endpoint: Url, rows_key: impl Into<String>) -> Self {
        Self {
            http,
            endpoint,
            rows_key: rows_key.into(),
            _rows: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Joins `path` onto `base_url` without dropping the base's own path.
pub fn endpoint_url(base_url: &Url, path: &str) -> Result<Url, SourceError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|err| SourceError::Transport(format!("invalid endpoint `{path}`: {err}")))
}

#[async_trait]
impl<T> ListSource<T> for RestListSource<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn fetch(&self, request: ListRequest) -> Result<ListPage<T>, SourceError> {
        let pairs = to_query_pairs(&request.descriptor);
        let mut builder = self.http.get(self.endpoint.clone()).query(&pairs);
        if let Some(token) = request.bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| SourceError::Transport(err.to_string()))?;
        let status = response.status();
        debug!(endpoint = %self.endpoint, status = status.as_u16(), "list response");

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ListEnvelope = response
            .json()
            .await
            .map_err(|err| SourceError::Decode(err.to_string()))?;
        envelope.into_page(&self.rows_key)
    }
}
