//! PDF attachment extraction.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use secrecy::SecretString;
use tracing::debug;

use super::types::{PDF_MEDIA_TYPE, PdfEntry, RunLog};
use crate::error::MailError;
use crate::mail::{AttachmentKind, MailMessage, MailProvider, RawAttachment};

/// Entries for the batch plus the messages they came from.
#[derive(Debug, Default)]
pub struct Extraction {
    pub entries: Vec<PdfEntry>,
    /// Messages with at least one entry, in listing order, each once.
    pub archive_candidates: Vec<String>,
}

/// File attachment declared as `application/pdf` (case-insensitive).
pub fn is_pdf_attachment(attachment: &RawAttachment) -> bool {
    attachment.kind == AttachmentKind::File
        && attachment
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
}

/// Decode the PDFs of one message.
pub fn pdf_entries_for_message(
    message_id: &str,
    attachments: &[RawAttachment],
) -> Result<Vec<PdfEntry>, MailError> {
    attachments
        .iter()
        .filter(|a| is_pdf_attachment(a))
        .map(|a| -> Result<PdfEntry, MailError> {
            let name = a.name.as_deref().unwrap_or_default();
            let decode_error = |reason: String| MailError::Decode {
                message_id: message_id.to_string(),
                name: name.to_string(),
                reason,
            };
            let encoded = a
                .content_base64
                .as_deref()
                .ok_or_else(|| decode_error("no content bytes".to_string()))?;
            let content = BASE64_STANDARD
                .decode(encoded)
                .map_err(|e| decode_error(e.to_string()))?;
            Ok(PdfEntry::new(message_id, name, content))
        })
        .collect()
}

/// Fetch attachments for every message and collect their PDFs.
///
/// Reads only. The first listing or decode failure aborts extraction.
pub async fn extract_pdfs(
    provider: &dyn MailProvider,
    token: &SecretString,
    mailbox: &str,
    messages: &[MailMessage],
    log: &mut RunLog,
) -> Result<Extraction, MailError> {
    let mut extraction = Extraction::default();

    for message in messages {
        let attachments = provider.list_attachments(token, mailbox, &message.id).await?;
        let entries = pdf_entries_for_message(&message.id, &attachments)?;
        let subject = message.subject.as_deref().unwrap_or("(no subject)");

        if entries.is_empty() {
            debug!(message_id = %message.id, attachments = attachments.len(), "No PDF attachments");
            log.push(format!("Message {} '{subject}': no PDF attachments, left in place", message.id));
            continue;
        }

        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        log.push(format!(
            "Message {} '{subject}': {} PDF(s): {}",
            message.id,
            entries.len(),
            names.join(", ")
        ));
        extraction.archive_candidates.push(message.id.clone());
        extraction.entries.extend(entries);
    }

    Ok(extraction)
}
