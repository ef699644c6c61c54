//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use secrecy::SecretString;

use pdf_inbox_relay::error::{HttpError, MailError, UploadError};
use pdf_inbox_relay::mail::{AttachmentKind, MailFolder, MailMessage, MailProvider, RawAttachment};
use pdf_inbox_relay::pipeline::{DocumentSink, PdfEntry, Pipeline, RunSettings};

/// "%PDF-1.4" base64-encoded.
pub const PDF_BYTES_B64: &str = "JVBERi0xLjQ=";

pub fn pdf_attachment(name: &str) -> RawAttachment {
    RawAttachment {
        kind: AttachmentKind::File,
        content_type: Some("application/pdf".into()),
        name: Some(name.into()),
        content_base64: Some(PDF_BYTES_B64.into()),
    }
}

pub fn png_attachment(name: &str) -> RawAttachment {
    RawAttachment {
        kind: AttachmentKind::File,
        content_type: Some("image/png".into()),
        name: Some(name.into()),
        content_base64: Some("iVBORw0KGgo=".into()),
    }
}

/// Mail provider that records every call.
pub struct RecordingMail {
    pub folders: Vec<MailFolder>,
    pub messages: Vec<(MailMessage, Vec<RawAttachment>)>,
    pub calls: Mutex<Vec<String>>,
    pub moves: Mutex<Vec<(String, String)>>,
}

impl RecordingMail {
    pub fn new(folder_names: &[&str]) -> Self {
        Self {
            folders: folder_names
                .iter()
                .map(|name| MailFolder {
                    id: format!("id-{name}"),
                    display_name: name.to_string(),
                })
                .collect(),
            messages: Vec::new(),
            calls: Mutex::new(Vec::new()),
            moves: Mutex::new(Vec::new()),
        }
    }

    pub fn message(mut self, id: &str, attachments: Vec<RawAttachment>) -> Self {
        self.messages.push((
            MailMessage {
                id: id.into(),
                subject: None,
            },
            attachments,
        ));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn moves(&self) -> Vec<(String, String)> {
        self.moves.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl MailProvider for RecordingMail {
    async fn authenticate(&self) -> Result<SecretString, MailError> {
        self.record("authenticate");
        Ok(SecretString::from("test-token"))
    }

    async fn list_folders(&self, _: &SecretString, _: &str) -> Result<Vec<MailFolder>, MailError> {
        self.record("list_folders");
        Ok(self.folders.clone())
    }

    async fn list_messages(
        &self,
        _: &SecretString,
        _: &str,
        folder_id: &str,
    ) -> Result<Vec<MailMessage>, MailError> {
        self.record(format!("list_messages {folder_id}"));
        Ok(self.messages.iter().map(|(m, _)| m.clone()).collect())
    }

    async fn list_attachments(
        &self,
        _: &SecretString,
        _: &str,
        message_id: &str,
    ) -> Result<Vec<RawAttachment>, MailError> {
        self.record(format!("list_attachments {message_id}"));
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
        self.record(format!("move {message_id}"));
        self.moves
            .lock()
            .unwrap()
            .push((message_id.to_string(), destination_id.to_string()));
        Ok(())
    }
}

/// Captured view of one uploaded entry.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub upload_key: String,
    pub filename: String,
    pub message_id: String,
}

/// Document sink that records batches, optionally failing every upload.
pub struct RecordingSink {
    pub fail: bool,
    pub batches: Mutex<Vec<Vec<UploadedPart>>>,
    pub calls: AtomicUsize,
}

impl RecordingSink {
    pub fn ok() -> Self {
        Self {
            fail: false,
            batches: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<UploadedPart>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentSink for RecordingSink {
    async fn upload(&self, entries: &[PdfEntry]) -> Result<(), UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(
            entries
                .iter()
                .map(|e| UploadedPart {
                    upload_key: e.upload_key.clone(),
                    filename: e.filename.clone(),
                    message_id: e.message_id.clone(),
                })
                .collect(),
        );
        if self.fail {
            return Err(UploadError::Failed {
                documents: entries.len(),
                source: HttpError::Body {
                    url: "http://sink.test".into(),
                    reason: "simulated failure".into(),
                },
            });
        }
        Ok(())
    }
}

pub fn settings(archive_folders: &[&str]) -> RunSettings {
    RunSettings {
        mailbox: "invoices@example.com".into(),
        source_folder: "Rechnungen".into(),
        archive_folders: archive_folders.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn pipeline(
    mail: std::sync::Arc<dyn MailProvider>,
    sink: std::sync::Arc<dyn DocumentSink>,
) -> Pipeline {
    Pipeline::new(mail, sink, settings(&["Archiv", "Archive"]))
}

