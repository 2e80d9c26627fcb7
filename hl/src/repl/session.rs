//! REPL session management

use std::path::Path;

use colored::Colorize;
use eyre::{Result, bail, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use super::ReplCommand;
use crate::actions::{CodeRunner, RunOutput, save_code};
use crate::extract::CodeBlock;
use crate::revision::{AttemptVerdict, RevisionAttempt, RevisionError, Session, Turn, TurnState, Verdict, VerdictOutcome};

/// Longest output shown inline before truncation
const MAX_DISPLAY_CHARS: usize = 4000;

/// Interactive REPL session
pub struct ReplSession {
    session: Session,
    runner: CodeRunner,
    /// Turn being revised, or the last one approved
    current: Option<Turn>,
}

impl ReplSession {
    pub fn new(session: Session, runner: CodeRunner) -> Self {
        debug!(session = %session.id(), "ReplSession::new: called");
        Self {
            session,
            runner,
            current: None,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial_question: Option<String>) -> Result<()> {
        self.print_welcome();

        if let Some(question) = initial_question {
            println!("{} {}", ">".bright_green(), question);
            let result = self.ask(&question).await;
            report(result);
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))?;

        loop {
            match rl.readline(&format!("{} ", self.prompt_marker())) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    let command = match ReplCommand::parse(input) {
                        Ok(command) => command,
                        Err(e) => {
                            println!("{} {}", "?".yellow(), e);
                            println!("Type {} for available commands", "/help".yellow());
                            continue;
                        }
                    };
                    if command == ReplCommand::Quit {
                        break;
                    }
                    let result = self.dispatch(command).await;
                    report(result);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// `?` while a verdict is pending, `>` otherwise
    fn prompt_marker(&self) -> String {
        match self.current.as_ref().map(Turn::state) {
            Some(TurnState::AwaitingVerdict) => "?".bright_yellow().to_string(),
            _ => ">".bright_green().to_string(),
        }
    }

    async fn dispatch(&mut self, command: ReplCommand) -> Result<()> {
        debug!(?command, "ReplSession::dispatch: called");
        match command {
            ReplCommand::Ask(question) => self.ask(&question).await,
            ReplCommand::Approve => self.verdict(Verdict::Approve).await,
            ReplCommand::Reject(feedback) => self.verdict(Verdict::Reject(feedback)).await,
            ReplCommand::Retry => self.retry().await,
            ReplCommand::Code => self.print_code(),
            ReplCommand::Run(block) => self.run_block(block).await,
            ReplCommand::Save { path, block } => self.save_block(&path, block).await,
            ReplCommand::Attempts => self.print_attempts(),
            ReplCommand::History => {
                self.print_history();
                Ok(())
            }
            ReplCommand::Clear => {
                self.session.clear_history();
                println!("{}", "Conversation cleared.".dimmed());
                Ok(())
            }
            ReplCommand::Help => {
                self.print_help();
                Ok(())
            }
            ReplCommand::Quit => Ok(()),
        }
    }

    /// Start a new turn, abandoning any unapproved one
    async fn ask(&mut self, question: &str) -> Result<()> {
        if let Some(turn) = &self.current
            && !turn.is_terminal()
        {
            println!("{}", "Abandoning unapproved turn.".dimmed());
        }

        let turn = Turn::new(question)?;
        self.current = Some(turn);
        self.generate_first().await
    }

    async fn generate_first(&mut self) -> Result<()> {
        let Some(turn) = self.current.as_mut() else {
            bail!("No question to answer");
        };
        println!("{}", "Thinking...".dimmed());
        let attempt = self.session.start_turn(turn).await.map_err(|e| {
            if e.is_retryable() {
                eyre!("{} ({})", e, retry_hint(&e, "/retry"))
            } else {
                eyre::Report::new(e)
            }
        })?;
        print_attempt(attempt);
        Ok(())
    }

    async fn verdict(&mut self, verdict: Verdict) -> Result<()> {
        let Some(turn) = self.current.as_mut() else {
            bail!("Nothing to judge yet; ask a question first");
        };
        if matches!(verdict, Verdict::Reject(_)) {
            println!("{}", "Revising...".dimmed());
        }

        let outcome = self.session.submit_verdict(turn, verdict).await.map_err(|e| {
            if e.is_retryable() {
                eyre!("{} ({})", e, retry_hint(&e, "/reject again"))
            } else {
                eyre::Report::new(e)
            }
        })?;
        match outcome {
            VerdictOutcome::Approved(turn) => {
                println!(
                    "{} after {} attempt(s). Ask a new question to continue.",
                    "Approved".bright_green().bold(),
                    turn.attempts().len()
                );
            }
            VerdictOutcome::Revised(attempt) => print_attempt(&attempt),
        }
        Ok(())
    }

    async fn retry(&mut self) -> Result<()> {
        match self.current.as_ref().map(Turn::state) {
            Some(TurnState::AwaitingGeneration) => self.generate_first().await,
            Some(TurnState::AwaitingVerdict) => {
                bail!("A response is waiting for a verdict; use /approve or /reject <feedback>")
            }
            Some(TurnState::Approved) => bail!("Turn already approved; ask a new question"),
            None => bail!("Nothing to retry"),
        }
    }

    /// Attempt whose code `/code`, `/run` and `/save` act on
    fn active_attempt(&self) -> Option<&RevisionAttempt> {
        self.current
            .as_ref()
            .and_then(Turn::current_attempt)
            .or_else(|| self.session.history().last().and_then(Turn::current_attempt))
    }

    fn select_block(&self, block: Option<usize>, python_only: bool) -> Result<CodeBlock> {
        let attempt = self.active_attempt().ok_or_else(|| eyre!("No response yet"))?;
        let blocks = attempt.extracted_code();
        if blocks.is_empty() {
            bail!("The response contains no code blocks");
        }

        let selected = match block {
            Some(n) => n
                .checked_sub(1)
                .and_then(|i| blocks.get(i))
                .ok_or_else(|| eyre!("No code block {} (response has {})", n, blocks.len()))?,
            None if python_only => blocks
                .iter()
                .find(|b| b.is_python())
                .ok_or_else(|| eyre!("The response contains no Python code"))?,
            None => &blocks[0],
        };
        if python_only && !selected.is_python() {
            bail!("Block is {}, only Python can be run", selected.label());
        }
        Ok(selected.clone())
    }

    async fn run_block(&self, block: Option<usize>) -> Result<()> {
        let code = self.select_block(block, true)?;
        println!("{}", format!("Running with {}...", self.runner.interpreter()).dimmed());
        let output = self.runner.execute(&code.text).await?;
        print_run_output(&output);
        Ok(())
    }

    async fn save_block(&self, path: &Path, block: Option<usize>) -> Result<()> {
        let code = self.select_block(block, false)?;
        let saved = save_code(&code.text, path).await?;
        println!("{} {} bytes to {}", "Saved".bright_green(), saved.bytes, saved.path.display());
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "hitloop - human-in-the-loop chat".bright_cyan().bold());
        let limit = match self.session.policy().max_attempts() {
            Some(n) => format!("{} attempts per question", n),
            None => "unlimited revisions".to_string(),
        };
        println!("Session {} ({})", self.session.id().dimmed(), limit);
        println!(
            "Type a question, then {} or {}. {} for help, {} to quit",
            "/y".yellow(),
            "/n <feedback>".yellow(),
            "/help".yellow(),
            "/quit".yellow()
        );
        println!();
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:20} Accept the current response", "/approve, /y".yellow());
        println!("  {:20} Reject with feedback and revise", "/reject, /n <text>".yellow());
        println!("  {:20} Retry a failed first generation", "/retry".yellow());
        println!("  {:20} List code blocks in the response", "/code".yellow());
        println!("  {:20} Run a Python block (default: first)", "/run [N]".yellow());
        println!("  {:20} Save a block to a file", "/save <path> [N]".yellow());
        println!("  {:20} Show attempts for this question", "/attempts".yellow());
        println!("  {:20} Show approved questions", "/history".yellow());
        println!("  {:20} Clear conversation history", "/clear".yellow());
        println!("  {:20} Show this help", "/help".yellow());
        println!("  {:20} Exit", "/quit".yellow());
        println!();
    }

    fn print_code(&self) -> Result<()> {
        let attempt = self.active_attempt().ok_or_else(|| eyre!("No response yet"))?;
        if !attempt.has_code() {
            println!("{}", "No code blocks in this response.".dimmed());
            return Ok(());
        }
        for (i, block) in attempt.extracted_code().iter().enumerate() {
            println!("{} {}", format!("[{}]", i + 1).bright_cyan(), block.label().yellow());
            println!("{}", block.text);
            println!();
        }
        Ok(())
    }

    fn print_attempts(&self) -> Result<()> {
        let turn = self.current.as_ref().ok_or_else(|| eyre!("No question asked yet"))?;
        println!();
        println!("{} {}", "Question:".bright_cyan(), turn.question());
        for attempt in turn.attempts() {
            let label = attempt.verdict().to_string();
            let verdict = match attempt.verdict() {
                AttemptVerdict::Approved => label.bright_green(),
                AttemptVerdict::Rejected => label.red(),
                AttemptVerdict::Pending => label.yellow(),
            };
            println!(
                "  {}. [{}] {} {} code block(s)",
                attempt.number(),
                verdict,
                attempt.created_at().format("%H:%M:%S"),
                attempt.extracted_code().len()
            );
            if let Some(feedback) = attempt.feedback_text() {
                println!("     feedback: {}", feedback.dimmed());
            }
        }
        println!();
        Ok(())
    }

    fn print_history(&self) {
        let history = self.session.history();
        if history.is_empty() {
            println!("{}", "No conversation history.".dimmed());
            return;
        }

        println!();
        println!("{}", "Conversation History:".bright_cyan());
        for (i, turn) in history.turns().iter().enumerate() {
            println!(
                "  {}. {} ({} attempt(s))",
                i + 1,
                preview(turn.question(), 60),
                turn.attempts().len()
            );
        }
        println!();
    }
}

/// Print a command failure and keep the loop going
fn report(result: Result<()>) {
    if let Err(e) = result {
        warn!(error = %e, "Command failed");
        println!("{} {}", "Error:".red(), e);
    }
}

fn print_attempt(attempt: &RevisionAttempt) {
    println!();
    println!("{}", format!("--- Attempt {} ---", attempt.number()).bright_blue());
    println!("{}", attempt.raw_response());
    println!();
    if attempt.has_code() {
        println!(
            "{}",
            format!("{} code block(s): /code to list, /run to execute", attempt.extracted_code().len()).dimmed()
        );
    }
    println!("{} {} or {}", "Verdict?".bright_yellow(), "/y".yellow(), "/n <feedback>".yellow());
}

/// How to try again after a transient failure, with the provider's wait if known
fn retry_hint(err: &RevisionError, action: &str) -> String {
    match err.retry_after() {
        Some(wait) => format!("wait {}s, then {}", wait.as_secs(), action),
        None => format!("use {}", action),
    }
}

fn print_run_output(output: &RunOutput) {
    if !output.stdout.is_empty() {
        println!("{}", truncate(&output.stdout));
    }
    if !output.stderr.is_empty() {
        println!("{}", truncate(&output.stderr).red());
    }
    if output.success() {
        println!("{}", "exit 0".bright_green());
    } else if let Some(code) = output.exit_status {
        println!("{}", format!("exit {}", code).red());
    } else {
        println!("{}", "terminated by signal".red());
    }
}

fn truncate(text: &str) -> String {
    let count = text.chars().count();
    if count > MAX_DISPLAY_CHARS {
        let head: String = text.chars().take(MAX_DISPLAY_CHARS).collect();
        format!("{}... ({} chars total)", head, count)
    } else {
        text.trim_end().to_string()
    }
}

fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max || text.lines().count() > 1 {
        let head: String = line.chars().take(max).collect();
        format!("{}...", head)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_output() {
        let long = "x".repeat(MAX_DISPLAY_CHARS + 10);
        let shown = truncate(&long);
        assert!(shown.ends_with(&format!("({} chars total)", MAX_DISPLAY_CHARS + 10)));
        assert_eq!(truncate("short\n"), "short");
    }

    #[test]
    fn test_retry_hint_includes_rate_limit_wait() {
        use crate::llm::LlmError;
        use crate::revision::GenerationError;
        use std::time::Duration;

        let limited = RevisionError::Generation(GenerationError::Llm(LlmError::RateLimited {
            provider: "openai".to_string(),
            retry_after: Duration::from_secs(30),
        }));
        assert_eq!(retry_hint(&limited, "/retry"), "wait 30s, then /retry");

        let empty = RevisionError::Generation(GenerationError::EmptyResponse);
        assert_eq!(retry_hint(&empty, "/retry"), "use /retry");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("add two numbers", 60), "add two numbers");
        assert_eq!(preview("first line\nsecond", 60), "first line...");
        assert_eq!(preview("abcdef", 3), "abc...");
    }
}
