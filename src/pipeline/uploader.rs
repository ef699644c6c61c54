//! Batch upload of all PDFs found in a run.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use secrecy::ExposeSecret;
use tracing::info;

use super::types::{PDF_MEDIA_TYPE, PdfEntry};
use crate::config::WeclappConfig;
use crate::error::{ConfigError, UploadError};
use crate::http::HttpInvoker;

const AUTH_HEADER: &str = "AuthenticationToken";

/// Receiver of the batch upload.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Upload every entry in one request. Fails as a whole.
    async fn upload(&self, entries: &[PdfEntry]) -> Result<(), UploadError>;
}

/// One multipart form with a part per entry.
///
/// Field name is the upload key, filename the normalized name, content type
/// always `application/pdf`.
pub fn build_form(entries: &[PdfEntry]) -> Form {
    entries.iter().fold(Form::new(), |form, entry| {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PDF_MEDIA_TYPE));
        let part = Part::bytes(entry.content.clone())
            .file_name(entry.filename.clone())
            .headers(headers);
        form.part(entry.upload_key.clone(), part)
    })
}

/// weclapp purchase-invoice document processing.
pub struct WeclappUploader {
    url: String,
    api_key: HeaderValue,
    invoker: HttpInvoker,
    timeout: Duration,
}

impl WeclappUploader {
    /// Fails if the API key cannot be sent as a header value.
    pub fn new(
        config: &WeclappConfig,
        invoker: HttpInvoker,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret()).map_err(|e| {
            ConfigError::InvalidValue {
                key: "WECLAPP_API_KEY".into(),
                message: e.to_string(),
            }
        })?;
        api_key.set_sensitive(true);

        Ok(Self {
            url: config.upload_url(),
            api_key,
            invoker,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DocumentSink for WeclappUploader {
    async fn upload(&self, entries: &[PdfEntry]) -> Result<(), UploadError> {
        if entries.is_empty() {
            return Err(UploadError::EmptyBatch);
        }

        let bytes: usize = entries.iter().map(|e| e.content.len()).sum();
        info!(url = %self.url, documents = entries.len(), bytes, "Uploading PDF batch");

        self.invoker
            .execute(Method::POST, &self.url, |req| {
                req.header(AUTH_HEADER, self.api_key.clone())
                    .header(ACCEPT, "application/json")
                    .timeout(self.timeout)
                    .multipart(build_form(entries))
            })
            .await
            .map_err(|source| UploadError::Failed {
                documents: entries.len(),
                source,
            })?;

        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        info!(files = %names.join(", "), "Upload succeeded");
        Ok(())
    }
}
