use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{SourceSnippet, TopK};

/// Body of `POST /query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub query: String,
    pub top_k: TopK,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    answer: Value,
    #[serde(default)]
    contexts: Option<Vec<SourceSnippet>>,
}

/// A settled answer with its supporting snippets, in backend order
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<SourceSnippet>,
}

impl From<QueryResponse> for QueryAnswer {
    fn from(response: QueryResponse) -> Self {
        let answer = match response.answer {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            answer,
            sources: response.contexts.unwrap_or_default(),
        }
    }
}

/// Success body of `POST /ingest`. `info` is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IngestSummary {
    #[serde(default)]
    pub info: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer_from(body: &str) -> QueryAnswer {
        serde_json::from_str::<QueryResponse>(body).unwrap().into()
    }

    #[test]
    fn string_answer_passes_through() {
        let answer = answer_from(r#"{"answer": "X is Y", "contexts": [{"id": "a1", "text": "..."}]}"#);
        assert_eq!(answer.answer, "X is Y");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].id, "a1");
    }

    #[test]
    fn non_string_answer_is_coerced() {
        assert_eq!(answer_from(r#"{"answer": 42}"#).answer, "42");
        assert_eq!(answer_from(r#"{"answer": {"k": true}}"#).answer, r#"{"k":true}"#);
        assert_eq!(answer_from(r#"{}"#).answer, "");
    }

    #[test]
    fn missing_or_null_contexts_mean_no_sources() {
        assert!(answer_from(r#"{"answer": "a"}"#).sources.is_empty());
        assert!(answer_from(r#"{"answer": "a", "contexts": null}"#).sources.is_empty());
    }

    #[test]
    fn request_serializes_top_k_as_integer() {
        let request = QueryRequest {
            query: "What is X?".to_string(),
            top_k: TopK::new(5),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"query": "What is X?", "top_k": 5})
        );
    }
}
