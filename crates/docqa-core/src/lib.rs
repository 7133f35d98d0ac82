pub mod backend;
pub mod config;
pub mod console;
pub mod error;
pub mod files;
pub mod input;
pub mod state;
pub mod uploader;

// Re-export main types for convenience
pub use backend::{BackendClient, IngestSummary, QueryAnswer, QueryRequest};
pub use config::Config;
pub use console::QueryConsole;
pub use error::ClientError;
pub use files::{FileContent, MediaFilter, PendingFile};
pub use input::LineInput;
pub use state::{ChatRole, SourceSnippet, Submission, TopK, Transcript, TranscriptEntry};
pub use uploader::{IngestBatch, UploadError, UploadStatus, Uploader};
