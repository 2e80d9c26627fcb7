//! hitloop - human-in-the-loop chat agent
//!
//! Every answer the model gives is held until a person approves it. A
//! rejection carries feedback, and the next attempt is generated from the
//! original question plus all feedback so far. Approved answers become the
//! conversation history sent as context for later questions.
//!
//! # Modules
//!
//! - [`revision`] - Turn state machine, engine, gateway and session
//! - [`extract`] - Fenced code block extraction
//! - [`llm`] - LLM client trait with Gemini, Anthropic and OpenAI implementations
//! - [`prompts`] - Embedded Handlebars prompt templates
//! - [`actions`] - Running and saving extracted code
//! - [`repl`] - Interactive terminal shell
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod actions;
pub mod cli;
pub mod config;
pub mod extract;
pub mod llm;
pub mod prompts;
pub mod repl;
pub mod revision;

// Re-export commonly used types
pub use config::{Config, LlmConfig, RevisionConfig, RunnerConfig};
pub use extract::{CodeBlock, extract_code_blocks};
pub use llm::{LlmClient, LlmError, create_client};
pub use prompts::PromptLoader;
pub use revision::{
    AttemptVerdict, ConversationHistory, Gateway, GenerationError, LlmGateway, RevisionAttempt, RevisionEngine,
    RevisionError, RevisionPolicy, Session, Turn, TurnState, Verdict, VerdictOutcome,
};
