//! Shared types for the fetch → extract → upload → archive pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::RunError;

/// Media type every uploaded part is declared as.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";
const PDF_EXTENSION: &str = ".pdf";
const FALLBACK_FILENAME: &str = "attachment";

// ── PdfEntry ────────────────────────────────────────────────────────

/// One extracted PDF, ready to become a part of the batch upload.
#[derive(Debug, Clone)]
pub struct PdfEntry {
    /// Multipart field name. Unique across the whole run.
    pub upload_key: String,
    /// Always ends in `.pdf`.
    pub filename: String,
    pub content: Vec<u8>,
    /// Message this attachment came from.
    pub message_id: String,
}

impl PdfEntry {
    pub fn new(message_id: &str, declared_name: &str, content: Vec<u8>) -> Self {
        Self {
            upload_key: new_upload_key(),
            filename: normalize_pdf_filename(declared_name),
            content,
            message_id: message_id.to_string(),
        }
    }
}

/// A fresh multipart field name, independent of filename and message.
pub fn new_upload_key() -> String {
    format!("file_{}", Uuid::new_v4().simple())
}

/// Ensure `name` ends in `.pdf` (case-insensitive). Idempotent.
///
/// Blank names become `attachment.pdf`.
pub fn normalize_pdf_filename(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return format!("{FALLBACK_FILENAME}{PDF_EXTENSION}");
    }
    if name.to_ascii_lowercase().ends_with(PDF_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{PDF_EXTENSION}")
    }
}

// ── Run log ─────────────────────────────────────────────────────────

/// Ordered, append-only event list for one run.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    events: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: impl Into<String>) {
        self.events.push(event.into());
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<String> {
        self.events
    }

    /// Write every event through `tracing`, in order.
    pub fn emit(&self, failed: bool) {
        for (i, event) in self.events.iter().enumerate() {
            if failed {
                warn!(step = i + 1, "{event}");
            } else {
                info!(step = i + 1, "{event}");
            }
        }
    }
}

// ── Run results ─────────────────────────────────────────────────────

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The source folder was empty.
    NoMessages,
    /// Messages were present but none carried a PDF.
    NoPdfs,
    /// The batch upload succeeded; candidates were archived (some may have failed).
    Uploaded,
}

/// An archive candidate that could not be moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveFailure {
    pub message_id: String,
    pub reason: String,
}

/// Result of the archive step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveReport {
    pub archived: Vec<String>,
    pub failures: Vec<ArchiveFailure>,
}

/// Everything a finished run reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub messages_seen: usize,
    pub pdfs_uploaded: usize,
    pub archived: Vec<String>,
    pub archive_failures: Vec<ArchiveFailure>,
    pub log: Vec<String>,
}

/// A run that aborted before or during upload. Nothing was archived.
#[derive(Debug, thiserror::Error)]
#[error("run {run_id} failed at {}: {error}", .error.stage())]
pub struct RunFailure {
    pub run_id: Uuid,
    #[source]
    pub error: RunError,
    pub log: Vec<String>,
}
