//! hitloop - human-in-the-loop chat agent
//!
//! CLI entry point for the chat REPL and its helper commands.

use std::fs;
use std::io::Read;
use std::path::Path;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use hitloop::cli::{Cli, Command, get_log_path};
use hitloop::config::Config;
use hitloop::extract::extract_code_blocks;
use hitloop::repl;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "hitloop loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None => cmd_chat(&config, None).await,
        Some(Command::Chat { question }) => cmd_chat(&config, question).await,
        Some(Command::Extract { file, python }) => cmd_extract(file.as_deref(), python),
        Some(Command::Config) => cmd_config(&config),
    }
}

/// Start the REPL after checking provider and credentials
async fn cmd_chat(config: &Config, question: Option<String>) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    repl::run_interactive(config, question).await
}

/// Print code blocks from a file or stdin
fn cmd_extract(file: Option<&Path>, python_only: bool) -> Result<()> {
    let text = match file {
        Some(path) => fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let mut found = 0;
    for block in extract_code_blocks(&text).filter(|b| !python_only || b.is_python()) {
        found += 1;
        println!("{} {}", format!("[{}]", found).bright_cyan(), block.label().yellow());
        println!("{}", block.text);
        println!();
    }

    if found == 0 {
        println!("{}", "No code blocks found.".dimmed());
    }
    info!(found, source = ?file, "Extracted code blocks");
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
