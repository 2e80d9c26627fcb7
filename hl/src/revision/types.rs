//! Turn, attempt and history types
//!
//! Fields are private; the engine mutates turns through crate-internal
//! methods so the attempt invariants cannot be broken from outside.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::RevisionError;
use crate::extract::CodeBlock;

/// Human decision on the current attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject(String),
}

/// Status of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptVerdict {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for AttemptVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptVerdict::Pending => write!(f, "pending"),
            AttemptVerdict::Approved => write!(f, "approved"),
            AttemptVerdict::Rejected => write!(f, "rejected"),
        }
    }
}

/// One generation for a turn
#[derive(Debug, Clone, Serialize)]
pub struct RevisionAttempt {
    number: u32,
    prompt_sent: String,
    raw_response: String,
    extracted_code: Vec<CodeBlock>,
    verdict: AttemptVerdict,
    feedback_text: Option<String>,
    created_at: DateTime<Utc>,
}

impl RevisionAttempt {
    /// 1-based position within the turn
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn prompt_sent(&self) -> &str {
        &self.prompt_sent
    }

    pub fn raw_response(&self) -> &str {
        &self.raw_response
    }

    pub fn extracted_code(&self) -> &[CodeBlock] {
        &self.extracted_code
    }

    pub fn verdict(&self) -> AttemptVerdict {
        self.verdict
    }

    /// Feedback that rejected this attempt
    pub fn feedback_text(&self) -> Option<&str> {
        self.feedback_text.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_code(&self) -> bool {
        !self.extracted_code.is_empty()
    }
}

/// Lifecycle of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurnState {
    AwaitingGeneration,
    AwaitingVerdict,
    Approved,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::AwaitingGeneration => write!(f, "awaiting generation"),
            TurnState::AwaitingVerdict => write!(f, "awaiting verdict"),
            TurnState::Approved => write!(f, "approved"),
        }
    }
}

/// One question and its attempts
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    question: String,
    attempts: Vec<RevisionAttempt>,
    state: TurnState,
}

impl Turn {
    /// Create a turn awaiting its first generation
    pub fn new(question: impl Into<String>) -> Result<Self, RevisionError> {
        let question = question.into();
        debug!(question_len = question.len(), "Turn::new: called");
        if question.trim().is_empty() {
            return Err(RevisionError::Validation("question must not be empty".to_string()));
        }
        Ok(Self {
            question,
            attempts: Vec::new(),
            state: TurnState::AwaitingGeneration,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// All attempts in creation order, rejected ones included
    pub fn attempts(&self) -> &[RevisionAttempt] {
        &self.attempts
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state == TurnState::Approved
    }

    /// The attempt awaiting a verdict, or the approved one
    pub fn current_attempt(&self) -> Option<&RevisionAttempt> {
        self.attempts.last().filter(|a| a.verdict != AttemptVerdict::Rejected)
    }

    /// Feedback from every rejected attempt, oldest first
    pub fn feedback(&self) -> Vec<String> {
        self.attempts
            .iter()
            .filter_map(|a| a.feedback_text.clone())
            .collect()
    }

    pub fn rejected_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.verdict == AttemptVerdict::Rejected)
            .count()
    }

    /// Response text of the approved attempt
    pub fn approved_response(&self) -> Option<&str> {
        self.current_attempt()
            .filter(|a| a.verdict == AttemptVerdict::Approved)
            .map(|a| a.raw_response.as_str())
    }

    /// Append a new pending attempt and move to `AwaitingVerdict`
    pub(crate) fn push_pending(
        &mut self,
        prompt_sent: String,
        raw_response: String,
        extracted_code: Vec<CodeBlock>,
    ) -> &RevisionAttempt {
        let number = self.attempts.len() as u32 + 1;
        debug!(number, code_blocks = extracted_code.len(), "Turn::push_pending: called");
        self.attempts.push(RevisionAttempt {
            number,
            prompt_sent,
            raw_response,
            extracted_code,
            verdict: AttemptVerdict::Pending,
            feedback_text: None,
            created_at: Utc::now(),
        });
        self.state = TurnState::AwaitingVerdict;
        &self.attempts[self.attempts.len() - 1]
    }

    /// Reject the pending attempt with feedback
    pub(crate) fn reject_current(&mut self, feedback: String) {
        if let Some(attempt) = self.attempts.last_mut() {
            debug!(number = attempt.number, "Turn::reject_current: called");
            attempt.verdict = AttemptVerdict::Rejected;
            attempt.feedback_text = Some(feedback);
        }
    }

    /// Approve the pending attempt; the turn becomes terminal
    pub(crate) fn approve_current(&mut self) {
        if let Some(attempt) = self.attempts.last_mut() {
            debug!(number = attempt.number, "Turn::approve_current: called");
            attempt.verdict = AttemptVerdict::Approved;
        }
        self.state = TurnState::Approved;
    }
}

/// Append-only log of approved turns, used as LLM context
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Last approved turn, if any
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Drop every turn (session reset)
    pub fn clear(&mut self) {
        debug!(turns = self.turns.len(), "ConversationHistory::clear: called");
        self.turns.clear();
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        debug!(turns = self.turns.len() + 1, "ConversationHistory::push: called");
        self.turns.push(turn);
    }
}
