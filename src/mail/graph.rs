//! Microsoft Graph mail client (client-credentials flow).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::{AttachmentKind, MailFolder, MailMessage, MailProvider, RawAttachment};
use crate::config::GraphConfig;
use crate::error::MailError;
use crate::http::HttpInvoker;

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
/// Upper bound on `@odata.nextLink` pages followed per listing.
const MAX_PAGES: usize = 200;
const FOLDER_PAGE_SIZE: &str = "100";
const MESSAGE_PAGE_SIZE: &str = "50";

#[derive(Debug, Deserialize)]
struct Page<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphFolder {
    id: String,
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct GraphMessage {
    id: String,
    subject: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphAttachment {
    #[serde(rename = "@odata.type", default)]
    odata_type: Option<String>,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    name: Option<String>,
    #[serde(rename = "contentBytes")]
    content_bytes: Option<String>,
}

/// [`MailProvider`] over the Graph v1.0 REST API.
pub struct GraphMailClient {
    config: GraphConfig,
    invoker: HttpInvoker,
    timeout: Duration,
}

impl GraphMailClient {
    pub fn new(config: GraphConfig, invoker: HttpInvoker, timeout: Duration) -> Self {
        Self {
            config,
            invoker,
            timeout,
        }
    }

    /// Build `{api_base}/users/{mailbox}/{segments...}` with each segment escaped.
    fn endpoint(&self, mailbox: &str, segments: &[&str]) -> Result<String, MailError> {
        let invalid = |reason: &str| MailError::InvalidResponse {
            endpoint: self.config.api_base.clone(),
            reason: reason.to_string(),
        };
        let mut url = Url::parse(&self.config.api_base).map_err(|e| invalid(&e.to_string()))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| invalid("base URL cannot carry a path"))?;
            path.pop_if_empty().push("users").push(mailbox);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url.to_string())
    }

    /// GET a collection, following `@odata.nextLink` until exhausted.
    async fn get_all<T: DeserializeOwned>(
        &self,
        token: &SecretString,
        url: String,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, MailError> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages >= MAX_PAGES {
                warn!(%url, pages, "Stopping pagination, page limit reached");
                break;
            }
            let first = pages == 0;
            let page: Page<T> = self
                .invoker
                .execute_json(Method::GET, &url, |req| {
                    let req = req.bearer_auth(token.expose_secret()).timeout(self.timeout);
                    if first { req.query(query) } else { req }
                })
                .await?;
            items.extend(page.value);
            next = page.next_link;
            pages += 1;
        }

        Ok(items)
    }
}

#[async_trait]
impl MailProvider for GraphMailClient {
    async fn authenticate(&self) -> Result<SecretString, MailError> {
        let url = self.config.token_url();
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("scope", GRAPH_SCOPE),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("grant_type", "client_credentials"),
        ];

        let resp: TokenResponse = self
            .invoker
            .execute_json(Method::POST, &url, |req| req.form(&form).timeout(self.timeout))
            .await?;

        match resp.access_token {
            Some(token) if !token.is_empty() => {
                info!(tenant = %self.config.tenant_id, "Acquired Graph access token");
                Ok(SecretString::from(token))
            }
            _ => Err(MailError::Auth(
                resp.error_description
                    .unwrap_or_else(|| "token response carried no access_token".to_string()),
            )),
        }
    }

    async fn list_folders(
        &self,
        token: &SecretString,
        mailbox: &str,
    ) -> Result<Vec<MailFolder>, MailError> {
        let url = self.endpoint(mailbox, &["mailFolders"])?;
        let folders: Vec<GraphFolder> = self
            .get_all(token, url, &[("$top", FOLDER_PAGE_SIZE)])
            .await?;
        debug!(count = folders.len(), "Listed mail folders");
        Ok(folders
            .into_iter()
            .map(|f| MailFolder {
                id: f.id,
                display_name: f.display_name,
            })
            .collect())
    }

    async fn list_messages(
        &self,
        token: &SecretString,
        mailbox: &str,
        folder_id: &str,
    ) -> Result<Vec<MailMessage>, MailError> {
        let url = self.endpoint(mailbox, &["mailFolders", folder_id, "messages"])?;
        let messages: Vec<GraphMessage> = self
            .get_all(
                token,
                url,
                &[("$select", "id,subject"), ("$top", MESSAGE_PAGE_SIZE)],
            )
            .await?;
        Ok(messages
            .into_iter()
            .map(|m| MailMessage {
                id: m.id,
                subject: m.subject,
            })
            .collect())
    }

    async fn list_attachments(
        &self,
        token: &SecretString,
        mailbox: &str,
        message_id: &str,
    ) -> Result<Vec<RawAttachment>, MailError> {
        let url = self.endpoint(mailbox, &["messages", message_id, "attachments"])?;
        let attachments: Vec<GraphAttachment> = self.get_all(token, url, &[]).await?;
        Ok(attachments
            .into_iter()
            .map(|a| RawAttachment {
                kind: a
                    .odata_type
                    .as_deref()
                    .map(AttachmentKind::from_odata_type)
                    .unwrap_or_else(|| AttachmentKind::Other(String::new())),
                content_type: a.content_type,
                name: a.name,
                content_base64: a.content_bytes,
            })
            .collect())
    }

    async fn move_message(
        &self,
        token: &SecretString,
        mailbox: &str,
        message_id: &str,
        destination_id: &str,
    ) -> Result<(), MailError> {
        let url = self.endpoint(mailbox, &["messages", message_id, "move"])?;
        let body = serde_json::json!({ "destinationId": destination_id });
        self.invoker
            .execute(Method::POST, &url, |req| {
                req.bearer_auth(token.expose_secret())
                    .json(&body)
                    .timeout(self.timeout)
            })
            .await?;
        Ok(())
    }
}
