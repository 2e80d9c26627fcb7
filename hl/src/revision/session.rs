//! Chat session: one engine plus the history it feeds

use std::sync::Arc;

use eyre::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    ConversationHistory, LlmGateway, RevisionAttempt, RevisionEngine, RevisionError, RevisionPolicy, Turn, Verdict,
    VerdictOutcome,
};
use crate::config::Config;
use crate::llm::create_client;
use crate::prompts::PromptLoader;

/// A single chat session
pub struct Session {
    id: String,
    engine: RevisionEngine,
    history: ConversationHistory,
}

impl Session {
    pub fn new(engine: RevisionEngine) -> Self {
        let id = Uuid::now_v7().to_string();
        debug!(%id, "Session::new: called");
        Self {
            id,
            engine,
            history: ConversationHistory::new(),
        }
    }

    /// Wire up provider client, prompts and gateway from config
    pub fn from_config(config: &Config) -> Result<Self> {
        debug!(provider = %config.llm.provider, "Session::from_config: called");
        let llm = create_client(&config.llm).context("Failed to create LLM client")?;
        let prompts = Arc::new(PromptLoader::new(config.prompts_dir.as_deref())?);
        let gateway = LlmGateway::from_config(llm, prompts.system_prompt(), &config.llm)
            .with_history_window(config.revision.history_window);
        let engine = RevisionEngine::new(Arc::new(gateway), prompts, RevisionPolicy::from(&config.revision));
        Ok(Self::new(engine))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn policy(&self) -> RevisionPolicy {
        self.engine.policy()
    }

    /// Generate the first attempt for `turn`
    pub async fn start_turn<'t>(&self, turn: &'t mut Turn) -> Result<&'t RevisionAttempt, RevisionError> {
        info!(session = %self.id, history_len = self.history.len(), "Starting turn");
        self.engine.start_turn(&self.history, turn).await
    }

    /// Apply a verdict to `turn`
    pub async fn submit_verdict(&mut self, turn: &mut Turn, verdict: Verdict) -> Result<VerdictOutcome, RevisionError> {
        info!(session = %self.id, approve = matches!(verdict, Verdict::Approve), "Submitting verdict");
        self.engine.submit_verdict(&mut self.history, turn, verdict).await
    }

    /// Forget every approved turn
    pub fn clear_history(&mut self) {
        info!(session = %self.id, turns = self.history.len(), "Clearing history");
        self.history.clear();
    }
}
