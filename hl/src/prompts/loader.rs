//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to the
//! embedded defaults, and renders revision prompts.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::{Handlebars, RenderError};
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

const REVISION_TEMPLATE: &str = "revision";

/// One numbered correction in a revision prompt
#[derive(Debug, Clone, Serialize)]
pub struct Correction {
    pub number: usize,
    pub text: String,
}

/// Context for rendering the revision template
#[derive(Debug, Clone, Serialize)]
pub struct RevisionContext {
    /// The turn's original question
    pub question: String,
    /// Every feedback so far, oldest first
    pub corrections: Vec<Correction>,
}

impl RevisionContext {
    pub fn new(question: &str, feedback: &[String]) -> Self {
        debug!(feedback_count = feedback.len(), "RevisionContext::new: called");
        Self {
            question: question.to_string(),
            corrections: feedback
                .iter()
                .enumerate()
                .map(|(i, text)| Correction {
                    number: i + 1,
                    text: text.clone(),
                })
                .collect(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars engine with the revision template registered
    hbs: Handlebars<'static>,
    /// System prompt text
    system: String,
}

impl PromptLoader {
    /// Create a loader, preferring templates found in `user_dir`
    pub fn new(user_dir: Option<&Path>) -> Result<Self> {
        debug!(?user_dir, "PromptLoader::new: called");
        let user_dir = user_dir.map(Path::to_path_buf);

        let system = load_template(user_dir.as_ref(), "system")?;
        let revision = load_template(user_dir.as_ref(), REVISION_TEMPLATE)?;

        let mut hbs = Handlebars::new();
        // Prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.set_strict_mode(true);
        hbs.register_template_string(REVISION_TEMPLATE, revision)
            .map_err(|e| eyre!("Failed to parse revision template: {}", e))?;

        Ok(Self { hbs, system })
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Result<Self> {
        debug!("PromptLoader::embedded_only: called");
        Self::new(None)
    }

    /// The system prompt
    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    /// Build the prompt for the next attempt of a turn
    ///
    /// The first attempt sends the question alone. Later attempts render the
    /// revision template with every feedback so far, most recent last.
    pub fn build_prompt(&self, question: &str, feedback: &[String]) -> Result<String, RenderError> {
        debug!(feedback_count = feedback.len(), "PromptLoader::build_prompt: called");
        if feedback.is_empty() {
            return Ok(question.to_string());
        }

        let context = RevisionContext::new(question, feedback);
        info!("Rendering revision prompt with {} correction(s)", context.corrections.len());
        let rendered = self.hbs.render(REVISION_TEMPLATE, &context)?;
        Ok(rendered.trim().to_string())
    }
}

/// Load a template by name
///
/// Checks `{user_dir}/{name}.pmt` first, then the embedded fallback.
fn load_template(user_dir: Option<&PathBuf>, name: &str) -> Result<String> {
    debug!(%name, "load_template: called");
    if let Some(dir) = user_dir {
        let path = dir.join(format!("{}.pmt", name));
        if path.exists() {
            debug!(?path, "load_template: found in user override");
            return std::fs::read_to_string(&path)
                .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
        }
        debug!(?path, "load_template: not found in user override");
    }

    embedded::get_embedded(name)
        .map(str::to_string)
        .ok_or_else(|| eyre!("Prompt template not found: {}", name))
}
