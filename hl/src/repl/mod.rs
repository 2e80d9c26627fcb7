//! Interactive REPL for hitloop
//!
//! Reads questions and verdicts from the terminal and drives a
//! [`Session`](crate::revision::Session) through the revision loop.

mod command;
mod session;

pub use command::{CommandError, ReplCommand};
pub use session::ReplSession;

use eyre::Result;
use tracing::info;

use crate::actions::CodeRunner;
use crate::config::Config;
use crate::revision::Session;

/// Run the interactive REPL
///
/// This is the main entry point for `hl chat`.
pub async fn run_interactive(config: &Config, initial_question: Option<String>) -> Result<()> {
    let session = Session::from_config(config)?;
    info!(session = %session.id(), provider = %config.llm.provider, model = %config.llm.model, "Starting chat");

    let runner = CodeRunner::from_config(&config.runner);
    let mut repl = ReplSession::new(session, runner);
    repl.run(initial_question).await
}
