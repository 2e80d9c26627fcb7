//! Actions on extracted code: run it or save it

mod error;
mod persist;
mod runner;

pub use error::ActionError;
pub use persist::{SavedFile, save_code};
pub use runner::{CodeRunner, RunOutput};
