//! Model gateway
//!
//! The engine talks to the model only through [`Gateway`], so the loop can be
//! driven by a stub in tests.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{ConversationHistory, GenerationError};
use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, LlmClient, Message, StopReason};

/// Turns a prompt plus conversation context into response text
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Generate a response for `prompt`, with `history` as prior context
    ///
    /// Returns non-empty text or a [`GenerationError`]. Never mutates history.
    async fn generate(&self, prompt: &str, history: &ConversationHistory) -> Result<String, GenerationError>;
}

/// Gateway backed by an [`LlmClient`]
pub struct LlmGateway {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    max_tokens: u32,
    temperature: Option<f32>,
    /// Number of approved turns replayed as context
    history_window: usize,
}

impl LlmGateway {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        debug!(model = %llm.model(), "LlmGateway::new: called");
        Self {
            llm,
            system_prompt: system_prompt.into(),
            max_tokens: 8192,
            temperature: None,
            history_window: 5,
        }
    }

    /// Gateway with sampling settings taken from config
    pub fn from_config(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>, config: &LlmConfig) -> Self {
        Self::new(llm, system_prompt)
            .with_max_tokens(config.max_tokens)
            .with_temperature(Some(config.temperature))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Assemble the request: system prompt, recent approved turns, then the prompt
    pub fn build_request(&self, prompt: &str, history: &ConversationHistory) -> CompletionRequest {
        let recent = history.recent(self.history_window);
        debug!(context_turns = recent.len(), "LlmGateway::build_request: called");

        let mut messages = Vec::with_capacity(recent.len() * 2 + 1);
        for turn in recent {
            if let Some(response) = turn.approved_response() {
                messages.push(Message::user(turn.question()));
                messages.push(Message::assistant(response));
            }
        }
        messages.push(Message::user(prompt));

        CompletionRequest {
            system_prompt: self.system_prompt.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl Gateway for LlmGateway {
    async fn generate(&self, prompt: &str, history: &ConversationHistory) -> Result<String, GenerationError> {
        debug!(prompt_len = prompt.len(), history_len = history.len(), "LlmGateway::generate: called");
        let request = self.build_request(prompt, history);

        let response = self.llm.complete(request).await.inspect_err(|e| {
            if e.is_auth_failure() {
                warn!(model = %self.llm.model(), "Provider rejected the API key");
            }
        })?;
        info!(
            model = %self.llm.model(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total(),
            "Generation complete"
        );

        match response.content {
            Some(text) if !text.trim().is_empty() => {
                if response.stop_reason == StopReason::MaxTokens {
                    warn!("Response truncated at max tokens");
                }
                Ok(text)
            }
            _ if response.stop_reason == StopReason::Blocked => {
                warn!("Provider blocked the response");
                Err(GenerationError::Blocked)
            }
            _ => {
                warn!("Provider returned no text");
                Err(GenerationError::EmptyResponse)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, LlmError, Role, TokenUsage};
    use crate::revision::Turn;

    fn approved_turn(question: &str, answer: &str) -> Turn {
        let mut turn = Turn::new(question).unwrap();
        turn.push_pending(question.to_string(), answer.to_string(), vec![]);
        turn.approve_current();
        turn
    }

    #[tokio::test]
    async fn test_generate_returns_text() {
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::text("def add(a, b): ...")]));
        let gateway = LlmGateway::new(mock.clone(), "rules");

        let text = gateway.generate("add two numbers", &ConversationHistory::new()).await.unwrap();

        assert_eq!(text, "def add(a, b): ...");
        assert_eq!(mock.call_count(), 1);
        let request = &mock.requests()[0];
        assert_eq!(request.system_prompt, "rules");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, "add two numbers");
    }

    #[tokio::test]
    async fn test_empty_and_whitespace_responses_fail() {
        let mock = Arc::new(MockLlmClient::new(vec![
            CompletionResponse::text("   \n"),
            CompletionResponse {
                content: None,
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            },
        ]));
        let gateway = LlmGateway::new(mock, "rules");
        let history = ConversationHistory::new();

        assert!(matches!(
            gateway.generate("q", &history).await,
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            gateway.generate("q", &history).await,
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_blocked_response() {
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse {
            content: None,
            stop_reason: StopReason::Blocked,
            usage: TokenUsage::default(),
        }]));
        let gateway = LlmGateway::new(mock, "rules");

        let err = gateway.generate("q", &ConversationHistory::new()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Blocked));
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let mock = Arc::new(MockLlmClient::new(vec![]));
        let gateway = LlmGateway::new(mock, "rules");

        let err = gateway.generate("q", &ConversationHistory::new()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Llm(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_request_replays_recent_approved_turns() {
        let mock = Arc::new(MockLlmClient::new(vec![]));
        let gateway = LlmGateway::new(mock, "rules")
            .with_history_window(2)
            .with_temperature(Some(0.3));

        let mut history = ConversationHistory::new();
        history.push(approved_turn("q1", "a1"));
        history.push(approved_turn("q2", "a2"));
        history.push(approved_turn("q3", "a3"));

        let request = gateway.build_request("q4", &history);

        let contents: Vec<(&Role, &str)> = request.messages.iter().map(|m| (&m.role, m.content.as_str())).collect();
        assert_eq!(
            contents,
            vec![
                (&Role::User, "q2"),
                (&Role::Assistant, "a2"),
                (&Role::User, "q3"),
                (&Role::Assistant, "a3"),
                (&Role::User, "q4"),
            ]
        );
        assert_eq!(request.temperature, Some(0.3));
    }

    #[test]
    fn test_zero_window_sends_prompt_only() {
        let mock = Arc::new(MockLlmClient::new(vec![]));
        let gateway = LlmGateway::new(mock, "rules").with_history_window(0);

        let mut history = ConversationHistory::new();
        history.push(approved_turn("q1", "a1"));

        let request = gateway.build_request("q2", &history);
        assert_eq!(request.messages.len(), 1);
    }
}
