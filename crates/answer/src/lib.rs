//! The `AnswerService` seam. This
//! crate is deliberately thin — the RAG/retrieval engine is an external
//! collaborator — modeled on a narrow provider trait: one async trait
//! plus a configurable stub double used throughout the test suite.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gw_domain::{ChatMessage, DocumentReference, Error, Result, RoutingAction};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// What comes back from `AnswerService::query`. Field names mirror the
/// wire contract exactly (`rag_strategy`, `tokens_used`, …)
/// so adapters can pass the response straight through to
/// `ResponseMetadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<DocumentReference>,
    pub rag_strategy: String,
    pub model_name: String,
    #[serde(default)]
    pub tokens_used: Option<u32>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub requires_human: bool,
    #[serde(default)]
    pub routing_action: Option<RoutingAction>,
    #[serde(default)]
    pub routing_reason: Option<String>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
}

/// Narrow seam to the out-of-scope RAG/retrieval engine.
/// The core never reaches past this trait.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn query(
        &self,
        question: &str,
        chat_history: Option<&[ChatMessage]>,
    ) -> Result<AnswerResponse>;
}

/// Test/dev double returning configurable canned responses. Not a RAG
/// implementation — the RAG/retrieval engine stays out of scope.
pub struct StubAnswerService {
    default_response: AnswerResponse,
    /// Exact-match overrides keyed by question text.
    overrides: Mutex<HashMap<String, AnswerResponse>>,
}

impl Default for StubAnswerService {
    fn default() -> Self {
        Self::new(AnswerResponse {
            answer: "I'm not sure, let me check.".into(),
            sources: Vec::new(),
            rag_strategy: "stub".into(),
            model_name: "stub-model".into(),
            tokens_used: None,
            confidence_score: Some(0.5),
            requires_human: false,
            routing_action: None,
            routing_reason: None,
            suggested_questions: Vec::new(),
        })
    }
}

impl StubAnswerService {
    pub fn new(default_response: AnswerResponse) -> Self {
        Self {
            default_response,
            overrides: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_override(self: Arc<Self>, question: impl Into<String>, response: AnswerResponse) -> Arc<Self> {
        self.overrides.lock().insert(question.into(), response);
        self
    }
}

#[async_trait]
impl AnswerService for StubAnswerService {
    async fn query(
        &self,
        question: &str,
        _chat_history: Option<&[ChatMessage]>,
    ) -> Result<AnswerResponse> {
        if let Some(r) = self.overrides.lock().get(question).cloned() {
            return Ok(r);
        }
        Ok(self.default_response.clone())
    }
}

/// Wraps any `AnswerService` so it always fails, for testing the
/// RAG_SERVICE_ERROR path.
pub struct FailingAnswerService {
    pub message: String,
}

#[async_trait]
impl AnswerService for FailingAnswerService {
    async fn query(
        &self,
        _question: &str,
        _chat_history: Option<&[ChatMessage]>,
    ) -> Result<AnswerResponse> {
        Err(Error::AnswerService(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_returns_default() {
        let svc = StubAnswerService::default();
        let r = svc.query("anything", None).await.unwrap();
        assert_eq!(r.model_name, "stub-model");
    }

    #[tokio::test]
    async fn stub_returns_override() {
        let svc = Arc::new(StubAnswerService::default()).with_override(
            "how do I back up my wallet?",
            AnswerResponse {
                answer: "Go to Settings -> Backup.".into(),
                sources: Vec::new(),
                rag_strategy: "faq".into(),
                model_name: "gpt".into(),
                tokens_used: Some(12),
                confidence_score: Some(0.97),
                requires_human: false,
                routing_action: None,
                routing_reason: None,
                suggested_questions: Vec::new(),
            },
        );
        let r = svc.query("how do I back up my wallet?", None).await.unwrap();
        assert_eq!(r.answer, "Go to Settings -> Backup.");
    }

    #[tokio::test]
    async fn failing_service_returns_answer_service_error() {
        let svc = FailingAnswerService {
            message: "upstream down".into(),
        };
        let err = svc.query("q", None).await.unwrap_err();
        assert!(matches!(err, Error::AnswerService(_)));
    }
}
