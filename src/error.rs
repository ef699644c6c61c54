//! Error types for the relay.

use std::fmt;

use reqwest::StatusCode;

use crate::pipeline::RunFailure;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Run(#[from] RunFailure),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Why a single HTTP attempt failed.
#[derive(Debug)]
pub enum AttemptFailure {
    /// Connection, TLS or timeout failure before a status was received.
    Transport(reqwest::Error),
    /// The server answered with a non-2xx status.
    Status { status: StatusCode, body: String },
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Status { status, body } if body.is_empty() => write!(f, "status {status}"),
            Self::Status { status, body } => write!(f, "status {status}: {body}"),
        }
    }
}

/// Errors from the retrying HTTP invoker.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("{method} {url} failed after {attempts} attempt(s): {last_cause}")]
    RetriesExhausted {
        method: String,
        url: String,
        attempts: u32,
        last_cause: AttemptFailure,
    },

    #[error("Failed to read response from {url}: {reason}")]
    Body { url: String, reason: String },
}

impl HttpError {
    /// Number of attempts made before giving up, if the budget was exhausted.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            Self::Body { .. } => None,
        }
    }
}

/// Mail provider errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Folder not found (looked for: {})", candidates.join(", "))]
    FolderNotFound { candidates: Vec<String> },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("Attachment {name} on message {message_id} could not be decoded: {reason}")]
    Decode {
        message_id: String,
        name: String,
        reason: String,
    },
}

/// Batch upload errors.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Refusing to upload an empty batch")]
    EmptyBatch,

    #[error("Batch upload of {documents} document(s) failed: {source}")]
    Failed {
        documents: usize,
        #[source]
        source: HttpError,
    },
}

/// A run-level failure, tagged with the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Authentication failed: {0}")]
    Authenticate(#[source] MailError),

    #[error("Folder resolution failed: {0}")]
    ResolveFolders(#[source] MailError),

    #[error("Listing messages failed: {0}")]
    ListMessages(#[source] MailError),

    #[error("Attachment extraction failed: {0}")]
    Extract(#[source] MailError),

    #[error("Upload failed, nothing archived: {0}")]
    Upload(#[source] UploadError),
}

impl RunError {
    /// Short name of the pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Authenticate(_) => "authenticate",
            Self::ResolveFolders(_) => "resolve_folders",
            Self::ListMessages(_) => "list_messages",
            Self::Extract(_) => "extract",
            Self::Upload(_) => "upload",
        }
    }
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
