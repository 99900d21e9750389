//! Scripted LLM client for tests and offline demos.

use super::{GenerationOptions, LlmClient, LlmFuture};
use crate::config::DEFAULT_ENDPOINT;
use crate::error::Pdf2QuizError;
use crate::output::ModelInfo;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted outcome for [`MockLlm::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Reply with this text.
    Text(String),
    /// Fail as if the service were down.
    Unavailable,
    /// Fail as if the model were not installed.
    ModelMissing,
    /// Fail with an unparseable payload.
    Malformed(String),
    /// Fail with a non-success HTTP status.
    ApiError(u16, String),
}

impl MockReply {
    pub fn text(s: impl Into<String>) -> Self {
        MockReply::Text(s.into())
    }
}

/// A hand-rolled [`LlmClient`] for tests.
///
/// Supports:
/// - A fixed reply (used for every call), **or**
/// - A sequence of replies (one per call, the last repeated once exhausted).
/// - An installed-model list for [`LlmClient::list_models`]. A mock whose
///   fallback reply is [`MockReply::Unavailable`] fails listing too.
/// - Optional per-call latency.
/// - Call counting and prompt capture.
pub struct MockLlm {
    replies: Mutex<Vec<MockReply>>,
    fallback: MockReply,
    models: Vec<ModelInfo>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockLlm {
    /// Create a mock that always answers with `reply`.
    pub fn new(reply: MockReply) -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            fallback: reply,
            models: Vec::new(),
            delay: None,
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock that answers with `replies` in order, repeating the
    /// last. An empty sequence behaves like `new(MockReply::Unavailable)`.
    pub fn with_sequence(mut replies: Vec<MockReply>) -> Self {
        let fallback = replies.last().cloned().unwrap_or(MockReply::Unavailable);
        replies.reverse();
        let mut mock = Self::new(fallback);
        mock.replies = Mutex::new(replies);
        mock
    }

    /// Models reported by `list_models`.
    pub fn with_models(mut self, names: &[&str]) -> Self {
        self.models = names.iter().map(|n| ModelInfo::named(*n)).collect();
        self
    }

    /// Simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `complete()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every prompt received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        match self.replies.lock() {
            Ok(mut seq) => seq.pop().unwrap_or_else(|| self.fallback.clone()),
            Err(_) => self.fallback.clone(),
        }
    }
}

fn unavailable() -> Pdf2QuizError {
    Pdf2QuizError::ServiceUnavailable {
        endpoint: DEFAULT_ENDPOINT.to_string(),
        reason: "connection refused".into(),
    }
}

fn into_result(reply: MockReply, model: &str) -> Result<String, Pdf2QuizError> {
    match reply {
        MockReply::Text(text) => Ok(text),
        MockReply::Unavailable => Err(unavailable()),
        MockReply::ModelMissing => Err(Pdf2QuizError::ModelNotFound {
            model: model.to_string(),
        }),
        MockReply::Malformed(detail) => Err(Pdf2QuizError::MalformedResponse { detail }),
        MockReply::ApiError(status, message) => Err(Pdf2QuizError::LlmApiError { status, message }),
    }
}

impl LlmClient for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        options: &'a GenerationOptions,
    ) -> LlmFuture<'a, String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let reply = self.next_reply();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            into_result(reply, &options.model)
        })
    }

    fn list_models(&self) -> LlmFuture<'_, Vec<ModelInfo>> {
        Box::pin(async move {
            if self.fallback == MockReply::Unavailable {
                return Err(unavailable());
            }
            Ok(self.models.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> GenerationOptions {
        GenerationOptions {
            model: "llama3:latest".into(),
            temperature: 0.3,
            max_tokens: 64,
        }
    }

    #[tokio::test]
    async fn sequence_then_repeat_last() {
        let mock = MockLlm::with_sequence(vec![MockReply::text("one"), MockReply::text("two")]);
        let o = opts();
        assert_eq!(mock.complete("a", &o).await.unwrap(), "one");
        assert_eq!(mock.complete("b", &o).await.unwrap(), "two");
        assert_eq!(mock.complete("c", &o).await.unwrap(), "two");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn scripted_failures_map_to_errors() {
        let o = opts();
        let err = MockLlm::new(MockReply::ModelMissing)
            .complete("p", &o)
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2QuizError::ModelNotFound { ref model } if model == "llama3:latest"));

        let err = MockLlm::new(MockReply::Unavailable)
            .complete("p", &o)
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2QuizError::ServiceUnavailable { .. }));
    }
}
