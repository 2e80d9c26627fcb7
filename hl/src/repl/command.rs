//! Slash command parsing

use std::path::PathBuf;

use thiserror::Error;

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Plain text: start a new turn
    Ask(String),
    Approve,
    Reject(String),
    Retry,
    Code,
    /// 1-based block number, first Python block when `None`
    Run(Option<usize>),
    Save {
        path: PathBuf,
        block: Option<usize>,
    },
    Attempts,
    History,
    Clear,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("{command} requires {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Invalid block number '{0}' (blocks are numbered from 1)")]
    InvalidBlock(String),
}

impl ReplCommand {
    /// Parse a trimmed, non-empty input line
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let input = input.trim();
        if !input.starts_with('/') {
            return Ok(ReplCommand::Ask(input.to_string()));
        }

        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        match cmd {
            "/approve" | "/y" => Ok(ReplCommand::Approve),
            "/reject" | "/n" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "/reject",
                        argument: "feedback",
                    });
                }
                Ok(ReplCommand::Reject(rest.to_string()))
            }
            "/retry" | "/r" => Ok(ReplCommand::Retry),
            "/code" => Ok(ReplCommand::Code),
            "/run" => Ok(ReplCommand::Run(parse_block(optional_word(rest))?)),
            "/save" | "/s" => {
                let mut words = rest.split_whitespace();
                let path = words.next().ok_or(CommandError::MissingArgument {
                    command: "/save",
                    argument: "a path",
                })?;
                Ok(ReplCommand::Save {
                    path: PathBuf::from(path),
                    block: parse_block(words.next())?,
                })
            }
            "/attempts" | "/a" => Ok(ReplCommand::Attempts),
            "/history" => Ok(ReplCommand::History),
            "/clear" | "/c" => Ok(ReplCommand::Clear),
            "/help" | "/h" => Ok(ReplCommand::Help),
            "/quit" | "/q" | "/exit" => Ok(ReplCommand::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn optional_word(rest: &str) -> Option<&str> {
    rest.split_whitespace().next()
}

fn parse_block(word: Option<&str>) -> Result<Option<usize>, CommandError> {
    match word {
        None => Ok(None),
        Some(w) => match w.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(CommandError::InvalidBlock(w.to_string())),
        },
    }
}
