//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hitloop - chat with an LLM and approve or reject each answer
#[derive(Parser)]
#[command(
    name = "hl",
    about = "Human-in-the-loop chat agent: approve answers or reject them with feedback",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute; `chat` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive chat session
    Chat {
        /// First question to ask
        question: Option<String>,
    },

    /// Print the fenced code blocks found in a file (stdin when omitted)
    Extract {
        /// File to scan
        file: Option<PathBuf>,

        /// Only print Python blocks
        #[arg(short, long)]
        python: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Path of the log file written by `hl`
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hitloop")
        .join("logs")
        .join("hitloop.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["hl"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_chat_with_question_and_global_flags() {
        let cli = Cli::try_parse_from(["hl", "chat", "add two numbers", "--log-level", "debug"]).unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Some(Command::Chat { question }) => assert_eq!(question.as_deref(), Some("add two numbers")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_extract_flags() {
        let cli = Cli::try_parse_from(["hl", "extract", "answer.md", "--python"]).unwrap();
        match cli.command {
            Some(Command::Extract { file, python }) => {
                assert_eq!(file, Some(PathBuf::from("answer.md")));
                assert!(python);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("hitloop/logs/hitloop.log"));
    }
}
