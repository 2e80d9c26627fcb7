//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// System prompt sent with every request
pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");

/// Revision prompt used once a turn has feedback
pub const REVISION: &str = include_str!("../../prompts/revision.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "system" => Some(SYSTEM),
        "revision" => Some(REVISION),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
