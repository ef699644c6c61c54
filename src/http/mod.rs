//! Outbound HTTP plumbing.
//!
//! Every call to the mail provider and the document endpoint goes through
//! [`HttpInvoker`], which owns the retry budget and backoff.

pub mod retry;

pub use retry::{HttpInvoker, RetryPolicy};
