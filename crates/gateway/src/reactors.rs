//! Cloneable seam around the Answer Service. `AppState` must be
//! `Clone` — one `Arc`-wrapped struct handed to every axum handler —
//! so the trait object is wrapped once here rather than at every call
//! site.

use std::sync::Arc;

use gw_answer::AnswerService;
use gw_domain::ChatMessage;

#[derive(Clone)]
pub struct AnswerServiceHandle {
    inner: Arc<dyn AnswerService>,
}

impl AnswerServiceHandle {
    pub fn new(inner: Arc<dyn AnswerService>) -> Self {
        Self { inner }
    }

    pub async fn query(
        &self,
        question: &str,
        chat_history: Option<&[ChatMessage]>,
    ) -> gw_domain::Result<gw_answer::AnswerResponse> {
        self.inner.query(question, chat_history).await
    }
}
