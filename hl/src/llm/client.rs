//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// Conversation context travels inside the request; the client keeps
/// nothing between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier, used for logging
    fn model(&self) -> &str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing::debug;

    /// Scripted client: pops one canned response per call and keeps the requests
    pub struct MockLlmClient {
        queue: Mutex<VecDeque<CompletionResponse>>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(queued = responses.len(), "MockLlmClient::new: called");
            Self {
                queue: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            self.queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::InvalidResponse("mock script exhausted".to_string()))
        }

        fn model(&self) -> &str {
            "mock"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::llm::Message;

        fn ask(question: &str) -> CompletionRequest {
            CompletionRequest {
                system_prompt: "answer with python".to_string(),
                messages: vec![Message::user(question)],
                max_tokens: 256,
                temperature: None,
            }
        }

        #[tokio::test]
        async fn test_replays_script_in_order() {
            let client = MockLlmClient::new(vec![
                CompletionResponse::text("first draft"),
                CompletionResponse::text("revised draft"),
            ]);

            let first = client.complete(ask("sum a list")).await.unwrap();
            let second = client.complete(ask("use sum()")).await.unwrap();

            assert_eq!(first.content.as_deref(), Some("first draft"));
            assert_eq!(second.content.as_deref(), Some("revised draft"));
            let asked: Vec<String> = client
                .requests()
                .iter()
                .map(|r| r.messages[0].content.clone())
                .collect();
            assert_eq!(asked, vec!["sum a list", "use sum()"]);
        }

        #[tokio::test]
        async fn test_exhausted_script_still_records_request() {
            let client = MockLlmClient::new(vec![]);

            let err = client.complete(ask("anything")).await.unwrap_err();

            assert!(matches!(err, LlmError::InvalidResponse(_)));
            assert_eq!(client.call_count(), 1);
        }
    }
}
