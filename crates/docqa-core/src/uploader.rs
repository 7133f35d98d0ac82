//! Pending-file list and the single in-flight ingestion submission.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, IngestSummary};
use crate::error::ClientError;
use crate::files::{MediaFilter, PendingFile};
use crate::state::Submission;

pub const GENERIC_UPLOAD_FAILURE: &str = "Upload failed. Please try again.";

/// Reasons `begin_submit` refuses to start
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Please select at least one file to upload.")]
    NoFiles,
    #[error("An upload is already in progress.")]
    Busy,
}

/// Last displayable outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Success(String),
    Error(String),
}

impl UploadStatus {
    pub fn message(&self) -> &str {
        match self {
            UploadStatus::Success(msg) | UploadStatus::Error(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, UploadStatus::Error(_))
    }
}

/// Snapshot of the files handed to one ingestion request
#[derive(Debug, Clone)]
pub struct IngestBatch {
    files: Vec<PendingFile>,
}

impl IngestBatch {
    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub type IngestListener = Box<dyn FnMut(&IngestSummary) + Send>;

pub struct Uploader {
    pending: Vec<PendingFile>,
    submission: Submission,
    status: Option<UploadStatus>,
    filter: MediaFilter,
    listener: Option<IngestListener>,
}

impl Default for Uploader {
    fn default() -> Self {
        Self::new(MediaFilter::default())
    }
}

impl Uploader {
    pub fn new(filter: MediaFilter) -> Self {
        Self {
            pending: Vec::new(),
            submission: Submission::Idle,
            status: None,
            filter,
            listener: None,
        }
    }

    /// Called with the server's ingestion summary after every successful upload
    pub fn set_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&IngestSummary) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn pending(&self) -> &[PendingFile] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.submission == Submission::InFlight
    }

    pub fn status(&self) -> Option<&UploadStatus> {
        self.status.as_ref()
    }

    pub fn filter(&self) -> &MediaFilter {
        &self.filter
    }

    /// Picker path: the user's explicit choice is admitted as-is, in order.
    pub fn select(&mut self, files: impl IntoIterator<Item = PendingFile>) {
        let before = self.pending.len();
        self.pending.extend(files);
        debug!(added = self.pending.len() - before, "files selected");
    }

    /// Drop path: files outside the media filter are excluded and reported.
    /// Returns the rejected files.
    pub fn drop_files(&mut self, files: impl IntoIterator<Item = PendingFile>) -> Vec<PendingFile> {
        let (accepted, rejected): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|f| self.filter.accepts(f));

        self.select(accepted);

        if !rejected.is_empty() {
            let names = rejected
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            debug!(%names, "dropped files rejected by media filter");
            self.status = Some(UploadStatus::Error(format!(
                "Only {} files are accepted. Skipped: {}",
                self.filter.describe(),
                names
            )));
        } else if self.status.as_ref().is_some_and(UploadStatus::is_error) {
            self.status = None;
        }

        rejected
    }

    /// No-op when `index` is out of range
    pub fn remove(&mut self, index: usize) -> Option<PendingFile> {
        if index < self.pending.len() {
            Some(self.pending.remove(index))
        } else {
            None
        }
    }

    /// Validate and mark the upload in flight. The returned batch is what the
    /// request must send; hand it back to [`Uploader::finish_submit`].
    pub fn begin_submit(&mut self) -> Result<IngestBatch, UploadError> {
        if self.is_busy() {
            return Err(UploadError::Busy);
        }
        if self.pending.is_empty() {
            self.status = Some(UploadStatus::Error(UploadError::NoFiles.to_string()));
            return Err(UploadError::NoFiles);
        }

        self.submission = Submission::InFlight;
        self.status = None;
        Ok(IngestBatch {
            files: self.pending.clone(),
        })
    }

    pub fn finish_submit(&mut self, batch: IngestBatch, result: Result<IngestSummary, ClientError>) {
        self.submission = Submission::Idle;

        match result {
            Ok(summary) => {
                let count = batch.len();
                info!(count, "upload succeeded");
                self.release(&batch);
                self.status = Some(UploadStatus::Success(format!(
                    "Successfully uploaded {} file{}.",
                    count,
                    if count == 1 { "" } else { "s" }
                )));
                if let Some(listener) = self.listener.as_mut() {
                    listener(&summary);
                }
            }
            Err(err) if err.is_cancelled() => {
                debug!("upload cancelled");
            }
            Err(err) => {
                warn!(error = %err, "upload failed");
                let message = err
                    .detail()
                    .map(str::to_string)
                    .unwrap_or_else(|| GENERIC_UPLOAD_FAILURE.to_string());
                self.status = Some(UploadStatus::Error(message));
            }
        }
    }

    /// Drop the files a finished batch sent. Files added while it was in
    /// flight stay pending, as do any removed from the list meanwhile.
    fn release(&mut self, batch: &IngestBatch) {
        for sent in &batch.files {
            if let Some(i) = self.pending.iter().position(|f| f == sent) {
                self.pending.remove(i);
            }
        }
    }

    /// Begin, send, and settle in one call.
    pub async fn submit(
        &mut self,
        client: &BackendClient,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let batch = self.begin_submit()?;
        let result = client.ingest(batch.files(), cancel).await;
        self.finish_submit(batch, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn pdf(name: &str) -> PendingFile {
        PendingFile::from_bytes(name, b"%PDF-1.4".to_vec())
    }

    fn names(uploader: &Uploader) -> Vec<&str> {
        uploader.pending().iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn select_appends_in_arrival_order_without_dedup() {
        let mut uploader = Uploader::default();
        uploader.select([pdf("a.pdf"), pdf("b.pdf")]);
        uploader.select([pdf("a.pdf")]);
        uploader.select(Vec::new());
        uploader.select([pdf("notes.txt")]);

        assert_eq!(names(&uploader), vec!["a.pdf", "b.pdf", "a.pdf", "notes.txt"]);
        assert_eq!(uploader.len(), 4);
    }

    #[test]
    fn remove_takes_exactly_one_and_keeps_order() {
        let mut uploader = Uploader::default();
        uploader.select([pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf"), pdf("d.pdf")]);

        let removed = uploader.remove(1).unwrap();
        assert_eq!(removed.name, "b.pdf");
        assert_eq!(names(&uploader), vec!["a.pdf", "c.pdf", "d.pdf"]);
        assert_eq!(uploader.len(), 4 - 1);
    }

    #[test]
    fn remove_out_of_range_changes_nothing() {
        let mut uploader = Uploader::default();
        uploader.select([pdf("a.pdf"), pdf("b.pdf")]);

        assert!(uploader.remove(2).is_none());
        assert!(uploader.remove(usize::MAX).is_none());
        assert_eq!(names(&uploader), vec!["a.pdf", "b.pdf"]);

        let mut empty = Uploader::default();
        assert!(empty.remove(0).is_none());
    }

    #[test]
    fn drop_excludes_and_reports_non_matching_files() {
        let mut uploader = Uploader::default();
        let rejected = uploader.drop_files([pdf("a.pdf"), pdf("notes.txt"), pdf("b.PDF")]);

        assert_eq!(names(&uploader), vec!["a.pdf", "b.PDF"]);
        assert_eq!(rejected.len(), 1);
        let status = uploader.status().unwrap();
        assert!(status.is_error());
        assert!(status.message().contains("notes.txt"));
        assert!(status.message().contains("PDF"));
    }

    #[test]
    fn drop_of_matching_files_sets_no_error() {
        let mut uploader = Uploader::default();
        assert!(uploader.drop_files([pdf("a.pdf")]).is_empty());
        assert!(uploader.status().is_none());
    }

    #[test]
    fn clean_drop_clears_earlier_rejection() {
        let mut uploader = Uploader::default();
        uploader.drop_files([pdf("notes.txt")]);
        assert!(uploader.status().unwrap().is_error());

        uploader.drop_files([pdf("a.pdf")]);
        assert!(uploader.status().is_none());
        assert_eq!(names(&uploader), vec!["a.pdf"]);
    }

    #[test]
    fn empty_submit_is_a_validation_error() {
        let mut uploader = Uploader::default();

        assert_eq!(uploader.begin_submit().unwrap_err(), UploadError::NoFiles);
        assert!(!uploader.is_busy());
        assert_eq!(
            uploader.status(),
            Some(&UploadStatus::Error("Please select at least one file to upload.".to_string()))
        );
    }

    #[tokio::test]
    async fn empty_submit_never_touches_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/ingest").expect(0).create_async().await;
        let client = BackendClient::new(&server.url(), Duration::from_secs(5)).unwrap();

        let mut uploader = Uploader::default();
        let result = uploader.submit(&client, &CancellationToken::new()).await;

        assert_eq!(result, Err(UploadError::NoFiles));
        mock.assert_async().await;
    }

    #[test]
    fn second_submit_while_in_flight_is_rejected() {
        let mut uploader = Uploader::default();
        uploader.select([pdf("a.pdf")]);

        let batch = uploader.begin_submit().unwrap();
        assert!(uploader.is_busy());
        assert_eq!(uploader.begin_submit().unwrap_err(), UploadError::Busy);

        uploader.finish_submit(batch, Ok(IngestSummary::default()));
        assert!(!uploader.is_busy());
    }

    #[test]
    fn success_clears_pending_and_reports_count() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut uploader = Uploader::default();
        uploader.set_listener(move |summary| sink.lock().unwrap().push(summary.info.clone()));
        uploader.select([pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")]);

        let batch = uploader.begin_submit().unwrap();
        uploader.finish_submit(
            batch,
            Ok(IngestSummary {
                info: serde_json::json!({"documents": 3}),
            }),
        );

        assert!(uploader.is_empty());
        let status = uploader.status().unwrap();
        assert!(!status.is_error());
        assert!(status.message().contains('3'));
        assert_eq!(*seen.lock().unwrap(), vec![serde_json::json!({"documents": 3})]);
    }

    #[test]
    fn files_added_during_upload_stay_pending() {
        let mut uploader = Uploader::default();
        uploader.select([pdf("a.pdf"), pdf("b.pdf")]);

        let batch = uploader.begin_submit().unwrap();
        uploader.select([pdf("c.pdf")]);
        uploader.drop_files([pdf("a.pdf")]);
        uploader.remove(1);
        uploader.finish_submit(batch, Ok(IngestSummary::default()));

        assert_eq!(names(&uploader), vec!["c.pdf", "a.pdf"]);
        assert_eq!(
            uploader.status().unwrap().message(),
            "Successfully uploaded 2 files."
        );
        assert!(!uploader.is_busy());
    }

    #[test]
    fn failure_prefers_server_detail_and_keeps_pending() {
        let mut uploader = Uploader::default();
        uploader.select([pdf("a.pdf"), pdf("b.pdf")]);

        let batch = uploader.begin_submit().unwrap();
        uploader.finish_submit(
            batch,
            Err(ClientError::Backend {
                status: StatusCode::BAD_REQUEST,
                detail: Some("bad file".to_string()),
            }),
        );

        assert_eq!(uploader.status().unwrap().message(), "bad file");
        assert_eq!(names(&uploader), vec!["a.pdf", "b.pdf"]);
        assert!(!uploader.is_busy());
    }

    #[test]
    fn failure_without_detail_uses_generic_message() {
        let mut uploader = Uploader::default();
        uploader.select([pdf("a.pdf")]);

        let batch = uploader.begin_submit().unwrap();
        uploader.finish_submit(batch, Err(ClientError::Timeout(Duration::from_secs(120))));

        assert_eq!(uploader.status().unwrap().message(), GENERIC_UPLOAD_FAILURE);
        assert_eq!(uploader.len(), 1);
    }

    #[test]
    fn cancelled_upload_leaves_state_alone() {
        let mut uploader = Uploader::default();
        uploader.select([pdf("a.pdf")]);

        let batch = uploader.begin_submit().unwrap();
        uploader.finish_submit(batch, Err(ClientError::Cancelled));

        assert!(uploader.status().is_none());
        assert_eq!(uploader.len(), 1);
        assert!(!uploader.is_busy());
    }

    #[tokio::test]
    async fn submit_against_backend_success_and_failure() {
        let mut server = mockito::Server::new_async().await;
        let client = BackendClient::new(&server.url(), Duration::from_secs(5)).unwrap();

        let failing = server
            .mock("POST", "/ingest")
            .with_status(422)
            .with_body(r#"{"detail": "bad file"}"#)
            .create_async()
            .await;

        let mut uploader = Uploader::default();
        uploader.select([pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")]);
        uploader.submit(&client, &CancellationToken::new()).await.unwrap();

        assert_eq!(uploader.status().unwrap().message(), "bad file");
        assert_eq!(uploader.len(), 3);
        failing.assert_async().await;
        failing.remove_async().await;

        let succeeding = server
            .mock("POST", "/ingest")
            .with_status(200)
            .with_body(r#"{"info": {"indexed": ["a.pdf", "b.pdf", "c.pdf"]}}"#)
            .create_async()
            .await;

        uploader.submit(&client, &CancellationToken::new()).await.unwrap();

        assert!(uploader.is_empty());
        assert!(uploader.status().unwrap().message().contains('3'));
        succeeding.assert_async().await;
    }
}
