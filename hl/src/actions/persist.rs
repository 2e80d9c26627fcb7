//! Save extracted code to disk

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::ActionError;

/// Where code was written and how much
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Write `code` to `path`, creating parent directories and overwriting any existing file
pub async fn save_code(code: &str, path: impl AsRef<Path>) -> Result<SavedFile, ActionError> {
    let path = path.as_ref();
    debug!(?path, code_len = code.len(), "save_code: called");

    if path.as_os_str().is_empty() {
        return Err(ActionError::InvalidArgument("path is required".to_string()));
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(|source| ActionError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    tokio::fs::write(path, code).await.map_err(|source| ActionError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), bytes = code.len(), "Saved code");
    Ok(SavedFile {
        path: path.to_path_buf(),
        bytes: code.len(),
    })
}
