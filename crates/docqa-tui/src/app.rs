use anyhow::Result;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use docqa_core::{
    BackendClient, ClientError, Config, IngestBatch, IngestSummary, LineInput, PendingFile,
    QueryAnswer, QueryConsole, Uploader,
};

use crate::paths::{expand_tilde, parse_dropped_paths};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Files,
    PathInput,
    Transcript,
    QueryInput,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Files => FocusPane::PathInput,
            FocusPane::PathInput => FocusPane::Transcript,
            FocusPane::Transcript => FocusPane::QueryInput,
            FocusPane::QueryInput => FocusPane::Files,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FocusPane::Files => FocusPane::QueryInput,
            FocusPane::PathInput => FocusPane::Files,
            FocusPane::Transcript => FocusPane::PathInput,
            FocusPane::QueryInput => FocusPane::Transcript,
        }
    }

    pub fn is_text_input(self) -> bool {
        matches!(self, FocusPane::PathInput | FocusPane::QueryInput)
    }
}

type UploadTask = JoinHandle<Result<IngestSummary, ClientError>>;
type QueryTask = JoinHandle<Result<QueryAnswer, ClientError>>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Uploader pane
    pub uploader: Uploader,
    pub files_state: ListState,
    pub path_input: LineInput,
    pub path_error: Option<String>,
    pub upload_task: Option<(IngestBatch, UploadTask)>,
    pub ingest_rx: mpsc::UnboundedReceiver<IngestSummary>,
    pub last_ingest: Option<String>,

    // Query console pane
    pub console: QueryConsole,
    pub query_task: Option<QueryTask>,
    pub selected_entry: Option<usize>,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub files_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8,

    pub client: BackendClient,
    pub cancel: CancellationToken,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let client = BackendClient::from_config(config)?;

        let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
        let mut uploader = Uploader::new(config.media_filter());
        uploader.set_listener(move |summary: &IngestSummary| {
            let _ = ingest_tx.send(summary.clone());
        });

        info!(base_url = client.base_url(), "starting app");

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Files,

            uploader,
            files_state: ListState::default(),
            path_input: LineInput::default(),
            path_error: None,
            upload_task: None,
            ingest_rx,
            last_ingest: None,

            console: QueryConsole::new(config.top_k()),
            query_task: None,
            selected_entry: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            chat_area: None,
            files_area: None,

            animation_frame: 0,

            client,
            cancel: CancellationToken::new(),
        })
    }

    // Uploader actions

    /// Picker path: add whatever path was typed, unfiltered
    pub async fn add_typed_path(&mut self) {
        let raw = self.path_input.take();
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }

        match PendingFile::from_path(expand_tilde(raw)).await {
            Ok(file) => {
                self.path_error = None;
                self.uploader.select([file]);
                self.select_last_file();
            }
            Err(err) => self.path_error = Some(err.to_string()),
        }
    }

    /// Drop path: pasted paths go through the uploader's media filter
    pub async fn drop_paths(&mut self, text: &str) {
        let mut files = Vec::new();
        let mut unreadable = Vec::new();
        for path in parse_dropped_paths(text) {
            match PendingFile::from_path(&path).await {
                Ok(file) => files.push(file),
                Err(_) => unreadable.push(display_name(&path)),
            }
        }

        self.path_error = if unreadable.is_empty() {
            None
        } else {
            Some(format!("Could not read: {}", unreadable.join(", ")))
        };

        if !files.is_empty() {
            self.uploader.drop_files(files);
            self.select_last_file();
        }
    }

    pub fn remove_selected_file(&mut self) {
        if let Some(i) = self.files_state.selected() {
            if self.uploader.remove(i).is_some() {
                // Adjust selection
                if self.uploader.is_empty() {
                    self.files_state.select(None);
                } else if i >= self.uploader.len() {
                    self.files_state.select(Some(self.uploader.len() - 1));
                }
            }
        }
    }

    pub fn start_upload(&mut self) {
        let Ok(batch) = self.uploader.begin_submit() else {
            // validation message already set on the uploader
            return;
        };

        let client = self.client.clone();
        let cancel = self.cancel.clone();
        let files = batch.files().to_vec();
        let handle = tokio::spawn(async move { client.ingest(&files, &cancel).await });
        self.upload_task = Some((batch, handle));
    }

    // Console actions

    pub fn start_query(&mut self) {
        let Some(request) = self.console.submit_input() else {
            return;
        };

        let client = self.client.clone();
        let cancel = self.cancel.clone();
        self.query_task = Some(tokio::spawn(async move {
            client.query(&request, &cancel).await
        }));
        self.selected_entry = None;
    }

    pub fn toggle_selected_sources(&mut self) {
        if let Some(i) = self.selected_entry {
            self.console.toggle_sources(i);
        }
    }

    /// Apply any finished request to its component
    pub async fn poll_tasks(&mut self) {
        if self.upload_task.as_ref().is_some_and(|(_, h)| h.is_finished()) {
            if let Some((batch, handle)) = self.upload_task.take() {
                let result = handle
                    .await
                    .unwrap_or_else(|e| Err(ClientError::Task(e.to_string())));
                self.uploader.finish_submit(batch, result);
                if self.uploader.is_empty() {
                    self.files_state.select(None);
                }
            }
        }

        if self.query_task.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.query_task.take() {
                let result = handle
                    .await
                    .unwrap_or_else(|e| Err(ClientError::Task(e.to_string())));
                self.console.settle(result);
            }
        }

        while let Ok(summary) = self.ingest_rx.try_recv() {
            debug!(info = %summary.info, "ingestion summary");
            self.last_ingest = Some(describe_ingest(&summary));
        }

        if self.console.take_scroll_request() {
            self.scroll_chat_to_bottom();
        }
    }

    /// Cancel outstanding requests so nothing settles after teardown
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some((_, handle)) = self.upload_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.query_task.take() {
            handle.abort();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.uploader.is_busy() || self.console.is_busy()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Navigation

    pub fn files_nav_down(&mut self) {
        let len = self.uploader.len();
        if len > 0 {
            let i = self.files_state.selected().map_or(0, |i| (i + 1).min(len - 1));
            self.files_state.select(Some(i));
        }
    }

    pub fn files_nav_up(&mut self) {
        if !self.uploader.is_empty() {
            let i = self.files_state.selected().unwrap_or(0);
            self.files_state.select(Some(i.saturating_sub(1)));
        }
    }

    fn select_last_file(&mut self) {
        if !self.uploader.is_empty() {
            self.files_state.select(Some(self.uploader.len() - 1));
        }
    }

    pub fn entry_nav_down(&mut self) {
        let len = self.console.transcript().len();
        if len > 0 {
            let i = self.selected_entry.map_or(0, |i| (i + 1).min(len - 1));
            self.selected_entry = Some(i);
        }
    }

    pub fn entry_nav_up(&mut self) {
        let len = self.console.transcript().len();
        if len > 0 {
            let i = self.selected_entry.map_or(len - 1, |i| i.saturating_sub(1));
            self.selected_entry = Some(i);
        }
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Scroll chat to bottom so the newest entry (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let wrapped = |text: &str| -> usize {
            text.lines()
                .map(|line| line.chars().count() / wrap_width + 1)
                .fold(0usize, usize::saturating_add)
                .max(1)
        };

        let mut total_lines: usize = 0;
        for (i, entry) in self.console.transcript().iter().enumerate() {
            // Role line, content, blank line after entry
            total_lines = total_lines.saturating_add(wrapped(&entry.content) + 2);
            if !entry.sources.is_empty() {
                total_lines = total_lines.saturating_add(1); // sources toggle hint
                if self.console.sources_open(i) {
                    for source in &entry.sources {
                        let text = format!("[{}] {}", source.id, source.text);
                        total_lines = total_lines.saturating_add(wrapped(&text));
                    }
                }
            }
        }

        if self.console.is_busy() {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };

        let bottom = total_lines.saturating_sub(visible_height);
        self.chat_scroll = u16::try_from(bottom).unwrap_or(u16::MAX);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One-line rendering of the opaque `info` value
pub fn describe_ingest(summary: &IngestSummary) -> String {
    match &summary.info {
        serde_json::Value::Null => "Indexed.".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
