//! Fenced code block extraction
//!
//! All pattern matching on model output lives here. Callers get structured
//! [`CodeBlock`] values and never see the regex.
//!
//! Fences must start a line, so inline triple backticks in prose are ignored.
//! Nested fences inside a block are not supported: the first line starting
//! with triple backticks closes the block.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Line-initial opening fence with optional tag, body, line-initial closing fence
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)^```([^\n`]*)\r?\n(.*?)^```").expect("code fence pattern is valid"));

/// Tags treated as runnable Python
const PYTHON_TAGS: &[&str] = &["python", "py", "python3"];

/// A fenced code region lifted out of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Language tag from the opening fence, if any
    pub language_tag: Option<String>,

    /// Code between the fences
    pub text: String,
}

impl CodeBlock {
    pub fn new(language_tag: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            language_tag: language_tag.map(str::to_string),
            text: text.into(),
        }
    }

    /// Whether this block can be handed to the Python runner
    ///
    /// Untagged fences count as Python since the system prompt asks the
    /// model to fence all code as ```python.
    pub fn is_python(&self) -> bool {
        match &self.language_tag {
            None => true,
            Some(tag) => PYTHON_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t)),
        }
    }

    /// Display label for listings
    pub fn label(&self) -> &str {
        self.language_tag.as_deref().unwrap_or("text")
    }
}

/// Extract fenced code blocks from `text`, in order of appearance
///
/// The iterator is lazy. A trailing fence with no closing marker yields
/// nothing.
pub fn extract_code_blocks(text: &str) -> impl Iterator<Item = CodeBlock> + '_ {
    debug!(text_len = text.len(), "extract_code_blocks: called");
    CODE_FENCE.captures_iter(text).map(|caps| {
        let tag = caps.get(1).map(|m| m.as_str().trim()).filter(|t| !t.is_empty());
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        CodeBlock::new(tag, body.trim_start_matches(['\n', '\r']).trim_end())
    })
}
