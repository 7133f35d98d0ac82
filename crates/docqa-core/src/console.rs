//! The chat-style query console: input buffer, transcript, and the single
//! in-flight query.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{BackendClient, QueryAnswer, QueryRequest};
use crate::error::ClientError;
use crate::input::LineInput;
use crate::state::{Submission, TopK, Transcript, TranscriptEntry};

pub const GENERIC_QUERY_FAILURE: &str = "Sorry, I couldn't get an answer from the server.";

#[derive(Debug, Default)]
pub struct QueryConsole {
    transcript: Transcript,
    input: LineInput,
    top_k: TopK,
    submission: Submission,
    // entries whose sources are expanded
    disclosed: HashSet<usize>,
    scroll_requested: bool,
}

impl QueryConsole {
    pub fn new(top_k: TopK) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn input(&self) -> &LineInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut LineInput {
        &mut self.input
    }

    pub fn top_k(&self) -> TopK {
        self.top_k
    }

    pub fn set_top_k(&mut self, top_k: TopK) {
        self.top_k = top_k;
    }

    pub fn increase_top_k(&mut self) {
        self.top_k = self.top_k.increment();
    }

    pub fn decrease_top_k(&mut self) {
        self.top_k = self.top_k.decrement();
    }

    pub fn is_busy(&self) -> bool {
        self.submission == Submission::InFlight
    }

    /// Record the question and mark the query in flight.
    ///
    /// Returns `None` (and changes nothing) for blank text or while another
    /// query is outstanding. Otherwise the user entry is appended right away,
    /// the input is cleared, and the request to send is returned; pass the
    /// outcome to [`QueryConsole::settle`].
    pub fn ask(&mut self, text: &str, top_k: TopK) -> Option<QueryRequest> {
        let query = text.trim();
        if query.is_empty() || self.is_busy() {
            return None;
        }

        self.push(TranscriptEntry::user(query));
        self.input.clear();
        self.submission = Submission::InFlight;

        Some(QueryRequest {
            query: query.to_string(),
            top_k,
        })
    }

    /// `ask` with the current input buffer and result count
    pub fn submit_input(&mut self) -> Option<QueryRequest> {
        let text = self.input.text().to_string();
        self.ask(&text, self.top_k)
    }

    pub fn settle(&mut self, result: Result<QueryAnswer, ClientError>) {
        self.submission = Submission::Idle;

        match result {
            Ok(answer) => {
                debug!(sources = answer.sources.len(), "answer received");
                self.push(TranscriptEntry::assistant(answer.answer, answer.sources));
            }
            Err(err) if err.is_cancelled() => {
                debug!("query cancelled");
            }
            Err(err) => {
                warn!(error = %err, "query failed");
                let content = match err.detail() {
                    Some(detail) => format!("{} {}", GENERIC_QUERY_FAILURE, detail),
                    None => GENERIC_QUERY_FAILURE.to_string(),
                };
                self.push(TranscriptEntry::assistant(content, Vec::new()));
            }
        }
    }

    /// Ask, send, and settle in one call. Returns false when `ask` was a no-op.
    pub async fn ask_and_wait(
        &mut self,
        text: &str,
        top_k: TopK,
        client: &BackendClient,
        cancel: &CancellationToken,
    ) -> bool {
        let Some(request) = self.ask(text, top_k) else {
            return false;
        };
        let result = client.query(&request, cancel).await;
        self.settle(result);
        true
    }

    pub fn toggle_sources(&mut self, index: usize) {
        if index >= self.transcript.len() {
            return;
        }
        if !self.disclosed.remove(&index) {
            self.disclosed.insert(index);
        }
    }

    pub fn sources_open(&self, index: usize) -> bool {
        self.disclosed.contains(&index)
    }

    /// True once after each transcript change; the view scrolls to the newest entry.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    fn push(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
        self.scroll_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChatRole, SourceSnippet};
    use reqwest::StatusCode;
    use std::time::Duration;

    fn answer(text: &str, ids: &[&str]) -> QueryAnswer {
        QueryAnswer {
            answer: text.to_string(),
            sources: ids
                .iter()
                .map(|id| SourceSnippet {
                    id: id.to_string(),
                    text: "...".to_string(),
                    meta: None,
                })
                .collect(),
        }
    }

    #[test]
    fn blank_questions_are_ignored() {
        let mut console = QueryConsole::default();
        assert!(console.ask("", TopK::default()).is_none());
        assert!(console.ask("   ", TopK::default()).is_none());
        assert!(console.ask("\n\t", TopK::default()).is_none());

        assert!(console.transcript().is_empty());
        assert!(!console.is_busy());
        assert!(!console.take_scroll_request());
    }

    #[test]
    fn ask_appends_user_entry_before_any_response() {
        let mut console = QueryConsole::default();
        console.input_mut().insert_str("What is X?");

        let request = console.submit_input().unwrap();

        assert_eq!(request.query, "What is X?");
        assert_eq!(request.top_k, TopK::default());
        assert_eq!(console.transcript().len(), 1);
        let entry = console.transcript().last().unwrap();
        assert_eq!(entry.role, ChatRole::User);
        assert_eq!(entry.content, "What is X?");
        assert!(console.input().is_empty());
        assert_eq!(console.input().cursor(), 0);
        assert!(console.is_busy());
        assert!(console.take_scroll_request());
        assert!(!console.take_scroll_request());
    }

    #[test]
    fn question_is_trimmed() {
        let mut console = QueryConsole::default();
        let request = console.ask("  padded  ", TopK::new(3)).unwrap();
        assert_eq!(request.query, "padded");
        assert_eq!(request.top_k.get(), 3);
        assert_eq!(console.transcript().last().unwrap().content, "padded");
    }

    #[test]
    fn settled_answer_appends_one_assistant_entry_with_sources() {
        let mut console = QueryConsole::default();
        console.ask("What is X?", TopK::new(5)).unwrap();
        console.take_scroll_request();

        console.settle(Ok(answer("X is Y", &["a1"])));

        assert_eq!(console.transcript().len(), 2);
        let reply = console.transcript().last().unwrap();
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.content, "X is Y");
        assert_eq!(reply.sources.len(), 1);
        assert_eq!(reply.sources[0].id, "a1");
        assert!(!console.is_busy());
        assert!(console.take_scroll_request());
    }

    #[test]
    fn second_ask_while_pending_is_a_no_op() {
        let mut console = QueryConsole::default();
        console.ask("first", TopK::default()).unwrap();
        console.input_mut().insert_str("second");

        assert!(console.submit_input().is_none());
        assert!(console.ask("third", TopK::default()).is_none());
        assert_eq!(console.transcript().len(), 1);
        // the rejected text stays in the input
        assert_eq!(console.input().text(), "second");

        console.settle(Ok(answer("done", &[])));
        assert!(console.submit_input().is_some());
        assert_eq!(console.transcript().len(), 3);
    }

    #[test]
    fn failure_appends_generic_notice_with_detail() {
        let mut console = QueryConsole::default();
        console.ask("q", TopK::default()).unwrap();
        console.settle(Err(ClientError::Backend {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: Some("index missing".to_string()),
        }));

        let reply = console.transcript().last().unwrap();
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.content, format!("{} index missing", GENERIC_QUERY_FAILURE));
        assert!(reply.sources.is_empty());
        // the question stays visible
        assert_eq!(console.transcript().len(), 2);
    }

    #[test]
    fn failure_without_detail_is_just_the_notice() {
        let mut console = QueryConsole::default();
        console.ask("q", TopK::default()).unwrap();
        console.settle(Err(ClientError::Timeout(Duration::from_secs(120))));
        assert_eq!(console.transcript().last().unwrap().content, GENERIC_QUERY_FAILURE);
    }

    #[test]
    fn cancelled_query_appends_nothing() {
        let mut console = QueryConsole::default();
        console.ask("q", TopK::default()).unwrap();
        console.settle(Err(ClientError::Cancelled));
        assert_eq!(console.transcript().len(), 1);
        assert!(!console.is_busy());
    }

    #[test]
    fn top_k_adjustments_stay_in_range() {
        let mut console = QueryConsole::new(TopK::new(19));
        console.increase_top_k();
        console.increase_top_k();
        assert_eq!(console.top_k().get(), 20);

        console.set_top_k(TopK::new(2));
        console.decrease_top_k();
        console.decrease_top_k();
        assert_eq!(console.top_k().get(), 1);
    }

    #[test]
    fn sources_are_hidden_until_toggled() {
        let mut console = QueryConsole::default();
        console.ask("q", TopK::default()).unwrap();
        console.settle(Ok(answer("a", &["s1", "s2"])));

        assert!(!console.sources_open(1));
        console.toggle_sources(1);
        assert!(console.sources_open(1));
        console.toggle_sources(1);
        assert!(!console.sources_open(1));

        console.toggle_sources(42);
        assert!(!console.sources_open(42));
    }

    #[tokio::test]
    async fn ask_and_wait_round_trip_against_backend() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query")
            .match_body(mockito::Matcher::Json(
                serde_json::json!({"query": "What is X?", "top_k": 5}),
            ))
            .with_status(200)
            .with_body(r#"{"answer": "X is Y", "contexts": [{"id": "a1", "text": "..."}]}"#)
            .create_async()
            .await;
        let client = BackendClient::new(&server.url(), Duration::from_secs(5)).unwrap();

        let mut console = QueryConsole::default();
        let sent = console
            .ask_and_wait("What is X?", TopK::new(5), &client, &CancellationToken::new())
            .await;

        assert!(sent);
        let contents: Vec<_> = console.transcript().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["What is X?", "X is Y"]);
        assert_eq!(console.transcript().entries()[1].sources[0].id, "a1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn blank_ask_and_wait_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/query").expect(0).create_async().await;
        let client = BackendClient::new(&server.url(), Duration::from_secs(5)).unwrap();

        let mut console = QueryConsole::default();
        let sent = console
            .ask_and_wait("   ", TopK::default(), &client, &CancellationToken::new())
            .await;

        assert!(!sent);
        assert!(console.transcript().is_empty());
        mock.assert_async().await;
    }
}
