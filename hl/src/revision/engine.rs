//! Revision engine
//!
//! Drives a [`Turn`] through generate → verdict → regenerate until the human
//! approves it. Every state change happens only after the model call it
//! depends on has succeeded, so a failed call leaves the turn exactly as it
//! was and the same operation can be retried.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ConversationHistory, Gateway, RevisionAttempt, RevisionError, Turn, TurnState, Verdict};
use crate::config::RevisionConfig;
use crate::extract::extract_code_blocks;
use crate::prompts::PromptLoader;

/// Limits on how long a turn may be revised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevisionPolicy {
    max_attempts: Option<u32>,
}

impl RevisionPolicy {
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    /// Cap attempts per turn; a cap of 0 is raised to 1 since every turn gets its first attempt
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    /// Maximum attempts per turn, unbounded when `None`
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Whether a turn with `attempts` attempts may get another one
    pub fn allows(&self, attempts: usize) -> bool {
        match self.max_attempts {
            Some(limit) => attempts < limit as usize,
            None => true,
        }
    }
}

impl From<&RevisionConfig> for RevisionPolicy {
    fn from(config: &RevisionConfig) -> Self {
        match config.max_attempts {
            Some(limit) => Self::with_max_attempts(limit),
            None => Self::unbounded(),
        }
    }
}

/// Result of a verdict
#[derive(Debug, Clone)]
pub enum VerdictOutcome {
    /// Turn closed; holds the approved turn as appended to history
    Approved(Turn),
    /// Rejection accepted; holds the new pending attempt
    Revised(RevisionAttempt),
}

/// Revision loop state machine
pub struct RevisionEngine {
    gateway: Arc<dyn Gateway>,
    prompts: Arc<PromptLoader>,
    policy: RevisionPolicy,
}

impl RevisionEngine {
    pub fn new(gateway: Arc<dyn Gateway>, prompts: Arc<PromptLoader>, policy: RevisionPolicy) -> Self {
        debug!(?policy, "RevisionEngine::new: called");
        Self {
            gateway,
            prompts,
            policy,
        }
    }

    pub fn policy(&self) -> RevisionPolicy {
        self.policy
    }

    /// Generate the first attempt for a fresh turn
    ///
    /// On failure the turn stays in `AwaitingGeneration`.
    pub async fn start_turn<'t>(
        &self,
        history: &ConversationHistory,
        turn: &'t mut Turn,
    ) -> Result<&'t RevisionAttempt, RevisionError> {
        debug!(state = %turn.state(), "RevisionEngine::start_turn: called");
        if turn.state() != TurnState::AwaitingGeneration {
            return Err(RevisionError::InvalidState {
                operation: "start",
                state: turn.state(),
            });
        }

        let prompt = self.prompts.build_prompt(turn.question(), &turn.feedback())?;
        let response = self.generate(&prompt, history).await?;
        let code = extract_code_blocks(&response).collect();

        let attempt = turn.push_pending(prompt, response, code);
        info!(attempt = attempt.number(), code_blocks = attempt.extracted_code().len(), "Turn started");
        Ok(attempt)
    }

    /// Apply a human verdict to the turn's pending attempt
    pub async fn submit_verdict(
        &self,
        history: &mut ConversationHistory,
        turn: &mut Turn,
        verdict: Verdict,
    ) -> Result<VerdictOutcome, RevisionError> {
        debug!(?verdict, state = %turn.state(), "RevisionEngine::submit_verdict: called");
        match verdict {
            Verdict::Approve => {
                self.approve(history, turn)?;
                Ok(VerdictOutcome::Approved(turn.clone()))
            }
            Verdict::Reject(feedback) => {
                let attempt = self.reject(history, turn, &feedback).await?;
                Ok(VerdictOutcome::Revised(attempt.clone()))
            }
        }
    }

    /// Approve the pending attempt and append a snapshot of the turn to history
    pub fn approve(&self, history: &mut ConversationHistory, turn: &mut Turn) -> Result<(), RevisionError> {
        debug!(state = %turn.state(), "RevisionEngine::approve: called");
        if turn.state() != TurnState::AwaitingVerdict {
            return Err(RevisionError::InvalidState {
                operation: "approve",
                state: turn.state(),
            });
        }

        turn.approve_current();
        history.push(turn.clone());
        info!(attempts = turn.attempts().len(), history_len = history.len(), "Turn approved");
        Ok(())
    }

    /// Reject the pending attempt and generate a revision
    ///
    /// The rejection is committed only once the revision has been generated.
    pub async fn reject<'t>(
        &self,
        history: &ConversationHistory,
        turn: &'t mut Turn,
        feedback: &str,
    ) -> Result<&'t RevisionAttempt, RevisionError> {
        debug!(feedback_len = feedback.len(), state = %turn.state(), "RevisionEngine::reject: called");
        if turn.state() != TurnState::AwaitingVerdict {
            return Err(RevisionError::InvalidState {
                operation: "reject",
                state: turn.state(),
            });
        }

        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(RevisionError::Validation("feedback must not be empty".to_string()));
        }

        if !self.policy.allows(turn.attempts().len()) {
            let limit = self.policy.max_attempts.unwrap_or_default();
            warn!(limit, "Revision limit reached");
            return Err(RevisionError::MaxRevisionsExceeded { limit });
        }

        let mut all_feedback = turn.feedback();
        all_feedback.push(feedback.to_string());

        let prompt = self.prompts.build_prompt(turn.question(), &all_feedback)?;
        let response = self.generate(&prompt, history).await?;
        let code = extract_code_blocks(&response).collect();

        turn.reject_current(feedback.to_string());
        let attempt = turn.push_pending(prompt, response, code);
        info!(attempt = attempt.number(), code_blocks = attempt.extracted_code().len(), "Revision generated");
        Ok(attempt)
    }

    async fn generate(&self, prompt: &str, history: &ConversationHistory) -> Result<String, RevisionError> {
        let text = self.gateway.generate(prompt, history).await.inspect_err(|e| {
            warn!(error = %e, "Generation failed");
        })?;
        if text.trim().is_empty() {
            return Err(super::GenerationError::EmptyResponse.into());
        }
        Ok(text)
    }
}
