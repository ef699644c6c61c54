//! PDF inbox relay: moves PDF attachments from a mailbox folder into weclapp and archives the mail.

pub mod config;
pub mod error;
pub mod http;
pub mod mail;
pub mod pipeline;
pub mod trigger;
