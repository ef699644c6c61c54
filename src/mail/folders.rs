//! Folder display name → provider folder id.

use secrecy::SecretString;
use tracing::debug;

use super::{MailFolder, MailProvider};
use crate::error::MailError;

/// Resolve the first folder whose display name matches one of `candidates`.
///
/// Candidates are tried in order and compared case-sensitively, so
/// `["Archiv", "Archive"]` prefers `Archiv` when both exist.
pub async fn resolve_folder(
    provider: &dyn MailProvider,
    token: &SecretString,
    mailbox: &str,
    candidates: &[String],
) -> Result<String, MailError> {
    let folders = provider.list_folders(token, mailbox).await?;
    let id = pick_folder(&folders, candidates).ok_or_else(|| MailError::FolderNotFound {
        candidates: candidates.to_vec(),
    })?;
    debug!(folder_id = %id, ?candidates, "Resolved folder");
    Ok(id.to_string())
}

/// Pure lookup used by [`resolve_folder`].
pub fn pick_folder<'a>(folders: &'a [MailFolder], candidates: &[String]) -> Option<&'a str> {
    candidates.iter().find_map(|name| {
        folders
            .iter()
            .find(|f| &f.display_name == name)
            .map(|f| f.id.as_str())
    })
}
