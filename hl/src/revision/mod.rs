//! Revision loop
//!
//! A [`Turn`] starts with a question, gets a generated [`RevisionAttempt`],
//! and is either approved (closing it and appending it to the
//! [`ConversationHistory`]) or rejected with feedback, which produces a new
//! attempt built from the question plus all feedback so far.

mod engine;
mod error;
mod gateway;
mod session;
mod types;

pub use engine::{RevisionEngine, RevisionPolicy, VerdictOutcome};
pub use error::{GenerationError, RevisionError};
pub use gateway::{Gateway, LlmGateway};
pub use session::Session;
pub use types::{AttemptVerdict, ConversationHistory, RevisionAttempt, Turn, TurnState, Verdict};
