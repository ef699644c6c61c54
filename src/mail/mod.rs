//! Mail provider abstraction.
//!
//! The pipeline only sees the [`MailProvider`] trait. [`GraphMailClient`] is
//! the Microsoft Graph implementation used in production.

pub mod folders;
pub mod graph;

pub use folders::resolve_folder;
pub use graph::GraphMailClient;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// A mail folder as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailFolder {
    pub id: String,
    pub display_name: String,
}

/// A message in a folder. Attachments are fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// How an attachment is carried by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Binary file content inline in the attachment resource.
    File,
    /// An attached message, event or contact.
    Item,
    /// A link to a file stored elsewhere.
    Reference,
    Other(String),
}

impl AttachmentKind {
    /// Map a Graph `@odata.type` value.
    pub fn from_odata_type(odata_type: &str) -> Self {
        match odata_type {
            "#microsoft.graph.fileAttachment" => Self::File,
            "#microsoft.graph.itemAttachment" => Self::Item,
            "#microsoft.graph.referenceAttachment" => Self::Reference,
            other => Self::Other(other.to_string()),
        }
    }
}

/// An attachment as returned by the provider, payload still base64-encoded.
#[derive(Debug, Clone)]
pub struct RawAttachment {
    pub kind: AttachmentKind,
    pub content_type: Option<String>,
    pub name: Option<String>,
    pub content_base64: Option<String>,
}

/// Operations the pipeline needs from a mailbox.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Acquire an access token for the following calls.
    async fn authenticate(&self) -> Result<SecretString, MailError>;

    /// All folders of the mailbox owner.
    async fn list_folders(
        &self,
        token: &SecretString,
        mailbox: &str,
    ) -> Result<Vec<MailFolder>, MailError>;

    /// Messages currently in `folder_id`, in provider order.
    async fn list_messages(
        &self,
        token: &SecretString,
        mailbox: &str,
        folder_id: &str,
    ) -> Result<Vec<MailMessage>, MailError>;

    /// Attachments of one message.
    async fn list_attachments(
        &self,
        token: &SecretString,
        mailbox: &str,
        message_id: &str,
    ) -> Result<Vec<RawAttachment>, MailError>;

    /// Move a message into `destination_id`.
    async fn move_message(
        &self,
        token: &SecretString,
        mailbox: &str,
        message_id: &str,
        destination_id: &str,
    ) -> Result<(), MailError>;
}
