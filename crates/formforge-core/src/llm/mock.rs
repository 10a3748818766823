//! Scripted provider for tests and offline runs.

use super::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(LLMError),
    /// Sleep before answering with the inner reply.
    Delayed(Duration, Box<MockReply>),
}

/// Mock provider replaying a script in order (wrapping around at the end)
/// and recording every request it receives.
pub struct MockProvider {
    replies: Vec<MockReply>,
    reply_idx: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            reply_idx: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: &str) -> Self {
        Self::new(vec![MockReply::Text(response.to_string())])
    }

    pub fn failing(error: LLMError) -> Self {
        Self::new(vec![MockReply::Error(error)])
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LLMError> {
        self.requests.lock().push(request.clone());

        if self.replies.is_empty() {
            return Err(LLMError::InvalidResponse("mock has no scripted replies".to_string()));
        }
        let idx = self.reply_idx.fetch_add(1, Ordering::SeqCst);
        let mut reply = self.replies[idx % self.replies.len()].clone();

        loop {
            match reply {
                MockReply::Text(content) => {
                    return Ok(CompletionResponse {
                        content,
                        finish_reason: FinishReason::Stop,
                        usage: Usage::default(),
                        model: "mock".to_string(),
                    })
                }
                MockReply::Error(err) => return Err(err),
                MockReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: "mock".to_string(),
            provider: "mock",
            supports_json_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![Message::user("Hello")])
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockProvider::always("Test response");
        let result = provider.complete(&request()).await.unwrap();
        assert_eq!(result.content, "Test response");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.requests()[0].user_prompt(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_script_wraps_around() {
        let provider = MockProvider::new(vec![
            MockReply::Text("first".to_string()),
            MockReply::Error(LLMError::Network("down".to_string())),
        ]);
        assert_eq!(provider.complete(&request()).await.unwrap().content, "first");
        assert!(provider.complete(&request()).await.is_err());
        assert_eq!(provider.complete(&request()).await.unwrap().content, "first");
    }

    #[tokio::test]
    async fn test_delayed_reply() {
        let provider = MockProvider::new(vec![MockReply::Delayed(
            Duration::from_millis(5),
            Box::new(MockReply::Text("late".to_string())),
        )]);
        assert_eq!(provider.complete(&request()).await.unwrap().content, "late");
    }
}
