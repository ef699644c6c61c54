//! In-memory collaborators for pipeline unit tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use secrecy::SecretString;

use super::types::PdfEntry;
use super::uploader::DocumentSink;
use crate::error::{MailError, UploadError};
use crate::mail::{AttachmentKind, MailFolder, MailMessage, MailProvider, RawAttachment};

/// A file attachment declared as PDF with a tiny valid payload.
pub fn pdf(name: &str) -> RawAttachment {
    RawAttachment {
        kind: AttachmentKind::File,
        content_type: Some("application/pdf".into()),
        name: Some(name.into()),
        content_base64: Some("JVBERi0=".into()),
    }
}

fn fake_failure(what: &str) -> MailError {
    MailError::InvalidResponse {
        endpoint: "fake".into(),
        reason: format!("{what} failed"),
    }
}

#[derive(Default)]
pub struct FakeMail {
    folders: Vec<MailFolder>,
    messages: Vec<(MailMessage, Vec<RawAttachment>)>,
    fail_auth: bool,
    fail_attachments: HashSet<String>,
    fail_moves: HashSet<String>,
    folder_listings: AtomicUsize,
    moves: Mutex<Vec<(String, String)>>,
}

impl FakeMail {
    /// Mailbox with `Inbox`, `Rechnungen` and `Archiv`, no messages.
    pub fn standard() -> Self {
        Self {
            folders: vec![
                MailFolder { id: "folder-inbox".into(), display_name: "Inbox".into() },
                MailFolder { id: "folder-source".into(), display_name: "Rechnungen".into() },
                MailFolder { id: "folder-archiv".into(), display_name: "Archiv".into() },
            ],
            ..Self::default()
        }
    }

    pub fn with_message(mut self, id: &str, attachments: Vec<RawAttachment>) -> Self {
        self.messages.push((
            MailMessage { id: id.into(), subject: Some(format!("Subject {id}")) },
            attachments,
        ));
        self
    }

    pub fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    pub fn failing_attachments_for(mut self, id: &str) -> Self {
        self.fail_attachments.insert(id.into());
        self
    }

    pub fn failing_move_for(mut self, id: &str) -> Self {
        self.fail_moves.insert(id.into());
        self
    }

    pub fn folder_listings(&self) -> usize {
        self.folder_listings.load(Ordering::SeqCst)
    }

    /// Every attempted move as `(message_id, destination_id)`.
    pub fn moves(&self) -> Vec<(String, String)> {
        self.moves.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailProvider for FakeMail {
    async fn authenticate(&self) -> Result<SecretString, MailError> {
        if self.fail_auth {
            return Err(MailError::Auth("invalid_client".into()));
        }
        Ok(SecretString::from("token"))
    }

    async fn list_folders(&self, _: &SecretString, _: &str) -> Result<Vec<MailFolder>, MailError> {
        self.folder_listings.fetch_add(1, Ordering::SeqCst);
        Ok(self.folders.clone())
    }

    async fn list_messages(
        &self,
        _: &SecretString,
        _: &str,
        folder_id: &str,
    ) -> Result<Vec<MailMessage>, MailError> {
        if folder_id != "folder-source" {
            return Ok(Vec::new());
        }
        Ok(self.messages.iter().map(|(m, _)| m.clone()).collect())
    }

    async fn list_attachments(
        &self,
        _: &SecretString,
        _: &str,
        message_id: &str,
    ) -> Result<Vec<RawAttachment>, MailError> {
        if self.fail_attachments.contains(message_id) {
            return Err(fake_failure("list_attachments"));
        }
        Ok(self
            .messages
            .iter()
            .find(|(m, _)| m.id == message_id)
            .map(|(_, a)| a.clone())
            .unwrap_or_default())
    }

    async fn move_message(
        &self,
        _: &SecretString,
        _: &str,
        message_id: &str,
        destination_id: &str,
    ) -> Result<(), MailError> {
        self.moves
            .lock()
            .unwrap()
            .push((message_id.to_string(), destination_id.to_string()));
        if self.fail_moves.contains(message_id) {
            return Err(fake_failure("move"));
        }
        Ok(())
    }
}

pub struct FakeSink {
    calls: AtomicUsize,
}

impl FakeSink {
    pub fn ok() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSink for FakeSink {
    async fn upload(&self, entries: &[PdfEntry]) -> Result<(), UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if entries.is_empty() {
            return Err(UploadError::EmptyBatch);
        }
        Ok(())
    }
}
