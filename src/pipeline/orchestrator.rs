//! Run orchestration.
//!
//! One run walks a fixed sequence:
//!
//! `authenticate → resolve folders → list messages → extract → upload → archive`
//!
//! Everything up to and including the upload is fatal to the run; archive
//! failures are per message. The run log is emitted once at the end on every
//! path.

use std::sync::Arc;

use chrono::Utc;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::archiver::archive_messages;
use super::extractor::extract_pdfs;
use super::types::{ArchiveReport, RunFailure, RunLog, RunOutcome, RunSummary};
use super::uploader::DocumentSink;
use crate::config::RelayConfig;
use crate::error::RunError;
use crate::mail::{MailProvider, resolve_folder};

/// Per-run inputs taken from configuration.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub mailbox: String,
    pub source_folder: String,
    pub archive_folders: Vec<String>,
}

impl From<&RelayConfig> for RunSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            mailbox: config.graph.mailbox.clone(),
            source_folder: config.folders.source.clone(),
            archive_folders: config.folders.archive_candidates.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    messages_seen: usize,
    pdfs_uploaded: usize,
    archive: ArchiveReport,
}

/// The fetch → extract → upload → archive pipeline.
pub struct Pipeline {
    mail: Arc<dyn MailProvider>,
    sink: Arc<dyn DocumentSink>,
    settings: RunSettings,
}

impl Pipeline {
    pub fn new(
        mail: Arc<dyn MailProvider>,
        sink: Arc<dyn DocumentSink>,
        settings: RunSettings,
    ) -> Self {
        Self {
            mail,
            sink,
            settings,
        }
    }

    /// Execute one complete run.
    ///
    /// Not guarded against concurrent calls; go through
    /// [`Runner`](crate::trigger::Runner) for that.
    pub async fn run(&self) -> Result<RunSummary, RunFailure> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("run", %run_id);

        let mut log = RunLog::new();
        let mut progress = Progress::default();
        let result = self
            .execute(&mut log, &mut progress)
            .instrument(span.clone())
            .await;

        match result {
            Ok(outcome) => {
                log.push(format!(
                    "Run finished: {} message(s), {} PDF(s) uploaded, {} archived, {} archive failure(s)",
                    progress.messages_seen,
                    progress.pdfs_uploaded,
                    progress.archive.archived.len(),
                    progress.archive.failures.len()
                ));
                span.in_scope(|| log.emit(!progress.archive.failures.is_empty()));
                Ok(RunSummary {
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                    outcome,
                    messages_seen: progress.messages_seen,
                    pdfs_uploaded: progress.pdfs_uploaded,
                    archived: progress.archive.archived,
                    archive_failures: progress.archive.failures,
                    log: log.into_events(),
                })
            }
            Err(error) => {
                log.push(format!("Run aborted at {}: {error}", error.stage()));
                span.in_scope(|| log.emit(true));
                Err(RunFailure {
                    run_id,
                    error,
                    log: log.into_events(),
                })
            }
        }
    }

    async fn execute(
        &self,
        log: &mut RunLog,
        progress: &mut Progress,
    ) -> Result<RunOutcome, RunError> {
        let mail = self.mail.as_ref();
        let mailbox = self.settings.mailbox.as_str();

        let token = mail.authenticate().await.map_err(RunError::Authenticate)?;
        log.push("Authenticated with mail provider");

        // Both folders before any side effect.
        let source_id = resolve_folder(
            mail,
            &token,
            mailbox,
            std::slice::from_ref(&self.settings.source_folder),
        )
        .await
        .map_err(RunError::ResolveFolders)?;
        let archive_id = resolve_folder(mail, &token, mailbox, &self.settings.archive_folders)
            .await
            .map_err(RunError::ResolveFolders)?;
        log.push(format!(
            "Resolved source folder '{}' and archive folder",
            self.settings.source_folder
        ));

        let messages = mail
            .list_messages(&token, mailbox, &source_id)
            .await
            .map_err(RunError::ListMessages)?;
        progress.messages_seen = messages.len();
        if messages.is_empty() {
            log.push(format!("No messages in '{}'", self.settings.source_folder));
            return Ok(RunOutcome::NoMessages);
        }
        log.push(format!(
            "Found {} message(s) in '{}'",
            messages.len(),
            self.settings.source_folder
        ));

        let extraction = extract_pdfs(mail, &token, mailbox, &messages, log)
            .await
            .map_err(RunError::Extract)?;
        if extraction.entries.is_empty() {
            log.push("No PDF attachments found");
            return Ok(RunOutcome::NoPdfs);
        }

        self.sink
            .upload(&extraction.entries)
            .await
            .map_err(RunError::Upload)?;
        progress.pdfs_uploaded = extraction.entries.len();
        log.push(format!(
            "Uploaded {} PDF(s) from {} message(s) in one batch",
            extraction.entries.len(),
            extraction.archive_candidates.len()
        ));

        progress.archive = archive_messages(
            mail,
            &token,
            mailbox,
            &extraction.archive_candidates,
            &archive_id,
            log,
        )
        .await;

        Ok(RunOutcome::Uploaded)
    }
}
