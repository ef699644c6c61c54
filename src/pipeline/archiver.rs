//! Moves uploaded messages into the archive folder.

use secrecy::SecretString;
use tracing::{error, info};

use super::types::{ArchiveFailure, ArchiveReport, RunLog};
use crate::mail::MailProvider;

/// Move each message to `archive_folder_id`.
///
/// Only call this after the batch upload succeeded. A failed move is recorded
/// and the remaining messages are still attempted; an unarchived message is
/// simply picked up again by the next run.
pub async fn archive_messages(
    provider: &dyn MailProvider,
    token: &SecretString,
    mailbox: &str,
    message_ids: &[String],
    archive_folder_id: &str,
    log: &mut RunLog,
) -> ArchiveReport {
    let mut report = ArchiveReport::default();

    for message_id in message_ids {
        match provider
            .move_message(token, mailbox, message_id, archive_folder_id)
            .await
        {
            Ok(()) => {
                info!(%message_id, "Message archived");
                log.push(format!("Message {message_id} archived"));
                report.archived.push(message_id.clone());
            }
            Err(e) => {
                error!(%message_id, error = %e, "Failed to archive message");
                log.push(format!("Message {message_id} NOT archived: {e}"));
                report.failures.push(ArchiveFailure {
                    message_id: message_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}
