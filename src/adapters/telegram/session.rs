//! Session storage. Load/save the grammers session file so authorization
//! survives restarts.

use crate::domain::DomainError;
use grammers_client::Client;
use grammers_session::Session;
use std::path::Path;

/// Open the session file, creating it (and parent directories) on first run.
pub async fn load_or_create(path: impl AsRef<Path>) -> Result<Session, DomainError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Auth(format!("create session directory: {e}")))?;
        }
    }
    Session::load_file_or_create(path).map_err(|e| {
        DomainError::Auth(format!("open session file '{}': {}", path.display(), e))
    })
}

/// Persist the client's current session state to `path`.
pub fn persist(client: &Client, path: impl AsRef<Path>) -> Result<(), DomainError> {
    let path = path.as_ref();
    client.session().save_to_file(path).map_err(|e| {
        DomainError::Auth(format!("save session file '{}': {}", path.display(), e))
    })
}
