//! The fetch → extract → upload → archive pipeline.
//!
//! 1. `mail::resolve_folder`: source and archive folder ids
//! 2. `extractor::extract_pdfs`: PDF attachments of every listed message
//! 3. `uploader::DocumentSink::upload`: one multipart request for the run
//! 4. `archiver::archive_messages`: only after the upload succeeded
//!
//! `orchestrator::Pipeline` sequences the steps; `guard::RunGuard` keeps runs
//! from overlapping.

pub mod archiver;
pub mod extractor;
#[cfg(test)]
pub(crate) mod fakes;
pub mod guard;
pub mod orchestrator;
pub mod types;
pub mod uploader;

pub use guard::{RunGuard, RunPermit};
pub use orchestrator::{Pipeline, RunSettings};
pub use types::{PdfEntry, RunFailure, RunLog, RunOutcome, RunSummary};
pub use uploader::{DocumentSink, WeclappUploader};
