use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{IngestSummary, QueryAnswer, QueryRequest, QueryResponse};
use crate::config::Config;
use crate::error::{detail_from_body, ClientError};
use crate::files::{content_type, PendingFile};

/// Multipart field name shared by every uploaded file
pub const INGEST_FIELD: &str = "files";

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Self::new(&config.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST {base}/ingest` with every file as one multipart part.
    pub async fn ingest(
        &self,
        files: &[PendingFile],
        cancel: &CancellationToken,
    ) -> Result<IngestSummary, ClientError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.send_ingest(files) => result,
        }
    }

    /// `POST {base}/query` with `{query, top_k}`.
    pub async fn query(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryAnswer, ClientError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.send_query(request) => result,
        }
    }

    async fn send_ingest(&self, files: &[PendingFile]) -> Result<IngestSummary, ClientError> {
        let url = format!("{}/ingest", self.base_url);

        let mut form = Form::new();
        for file in files {
            let bytes = file.read().await?;
            let part = Part::bytes(bytes)
                .file_name(file.name.clone())
                .mime_str(content_type(file))?;
            form = form.part(INGEST_FIELD, part);
        }

        info!(count = files.len(), %url, "uploading files");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &url, self.timeout))?;

        self.read_json(response, &url).await
    }

    async fn send_query(&self, request: &QueryRequest) -> Result<QueryAnswer, ClientError> {
        let url = format!("{}/query", self.base_url);

        debug!(top_k = request.top_k.get(), %url, "sending query");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &url, self.timeout))?;

        let body: QueryResponse = self.read_json(response, &url).await?;
        Ok(body.into())
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response,
        url: &str,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = detail_from_body(&text);
            warn!(%status, %url, detail = ?detail, "backend request failed");
            return Err(ClientError::Backend { status, detail });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::from_reqwest(e, url, self.timeout))
    }
}
