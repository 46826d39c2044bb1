use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fields requested from Graph for each message.
const MESSAGE_FIELDS: &str = "id,subject,from,bodyPreview,body,receivedDateTime,isRead";

/// An email message returned from the Microsoft Graph API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub from: Option<Recipient>,
    #[serde(default)]
    pub body_preview: String,
    pub body: Option<ItemBody>,
    pub received_date_time: Option<String>,
    #[serde(default)]
    pub is_read: bool,
}

impl EmailMessage {
    /// Sender address, or an empty string when Graph omits the `from` field
    /// (drafts can have no sender).
    pub fn sender_address(&self) -> &str {
        self.from
            .as_ref()
            .map(|r| r.email_address.address.as_str())
            .unwrap_or("")
    }

    /// The subject, or a placeholder when absent.
    pub fn subject_or_default(&self) -> &str {
        self.subject.as_deref().unwrap_or("(no subject)")
    }

    /// Best available body text: the full body content when present,
    /// otherwise the preview.
    pub fn body_text(&self) -> &str {
        match &self.body {
            Some(b) if !b.content.is_empty() => &b.content,
            _ => &self.body_preview,
        }
    }
}

/// A recipient wrapper as Graph nests it: `{"emailAddress": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

/// An email address with an optional display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: String,
}

/// Message body with its content type (`text` or `html`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content: String,
}

/// Microsoft Graph API client for Outlook mailbox reads.
///
/// Wraps the `/me/mailFolders/{folder}/messages` endpoint of the Microsoft
/// Graph v1.0 REST API.
pub struct OutlookMailClient {
    client: Client,
    access_token: String,
    base_url: String,
}

impl OutlookMailClient {
    /// Create a new client using the default Microsoft Graph base URL.
    pub fn new(access_token: &str) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Create a new client pointing at a custom base URL (useful for tests).
    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List messages in the given mail folder (e.g. `"inbox"`).
    ///
    /// Returns up to `top` messages; most-recent-first ordering is requested
    /// from (and delegated to) the provider.
    pub async fn list_messages(&self, folder: &str, top: u32) -> Result<Vec<EmailMessage>> {
        let url = format!(
            "{}/me/mailFolders/{}/messages?$top={}&$orderby=receivedDateTime desc&$select={}",
            self.base_url, folder, top, MESSAGE_FIELDS
        );
        debug!(url = %url, "listing Outlook messages");

        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Outlook list messages request failed")?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .context("failed to parse Outlook response")?;

        if !status.is_success() {
            anyhow::bail!("Microsoft Graph error ({}): {}", status, body);
        }

        let messages: Vec<EmailMessage> =
            serde_json::from_value(body.get("value").cloned().unwrap_or_default())
                .context("failed to deserialize email messages")?;

        Ok(messages)
    }

    /// Fetch the most recent inbox message, or `None` when the inbox is empty.
    pub async fn first_inbox_message(&self) -> Result<Option<EmailMessage>> {
        let mut messages = self.list_messages("inbox", 1).await?;
        Ok(if messages.is_empty() {
            None
        } else {
            Some(messages.remove(0))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// A realistic (abridged) Graph list response.
    const GRAPH_LIST_JSON: &str = r#"{
        "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users('me')/mailFolders('inbox')/messages",
        "value": [
            {
                "id": "AAMkAGI1",
                "subject": "Quarterly review",
                "from": {
                    "emailAddress": { "name": "Alice Adams", "address": "alice@example.com" }
                },
                "bodyPreview": "Please find attached...",
                "body": { "contentType": "text", "content": "Please find attached the slides." },
                "receivedDateTime": "2026-08-20T09:30:00Z",
                "isRead": false
            }
        ]
    }"#;

    #[test]
    fn client_default_base_url() {
        let client = OutlookMailClient::new("test_token");
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn custom_base_url_strips_trailing_slash() {
        let client = OutlookMailClient::with_base_url("tok", "https://graph.test.com/v1.0/");
        assert_eq!(client.base_url(), "https://graph.test.com/v1.0");
    }

    #[test]
    fn list_url_requests_recency_ordering() {
        let client = OutlookMailClient::new("tok");
        let url = format!(
            "{}/me/mailFolders/inbox/messages?$top=1&$orderby=receivedDateTime desc&$select={}",
            client.base_url(),
            MESSAGE_FIELDS
        );
        assert!(url.starts_with("https://graph.microsoft.com/v1.0/me/mailFolders/inbox/messages"));
        assert!(url.contains("$top=1"));
        assert!(url.contains("receivedDateTime desc"));
        assert!(url.contains("$select=id,subject,from,bodyPreview,body"));
    }

    #[test]
    fn deserializes_graph_list_response() {
        let body: serde_json::Value = serde_json::from_str(GRAPH_LIST_JSON).unwrap();
        let messages: Vec<EmailMessage> =
            serde_json::from_value(body.get("value").cloned().unwrap()).unwrap();

        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.id, "AAMkAGI1");
        assert_eq!(msg.subject.as_deref(), Some("Quarterly review"));
        assert_eq!(msg.sender_address(), "alice@example.com");
        assert_eq!(msg.body_text(), "Please find attached the slides.");
        assert!(!msg.is_read);
    }

    #[test]
    fn empty_value_array_deserializes_to_no_messages() {
        let body: serde_json::Value = serde_json::from_str(r#"{"value": []}"#).unwrap();
        let messages: Vec<EmailMessage> =
            serde_json::from_value(body.get("value").cloned().unwrap()).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn message_without_from_or_subject() {
        let json = r#"{ "id": "m1", "bodyPreview": "hello" }"#;
        let msg: EmailMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender_address(), "");
        assert_eq!(msg.subject_or_default(), "(no subject)");
        assert_eq!(msg.body_text(), "hello");
    }

    #[test]
    fn body_text_prefers_full_body_over_preview() {
        let msg = EmailMessage {
            id: "m1".into(),
            subject: Some("s".into()),
            from: None,
            body_preview: "preview".into(),
            body: Some(ItemBody {
                content_type: "text".into(),
                content: "full content".into(),
            }),
            received_date_time: None,
            is_read: true,
        };
        assert_eq!(msg.body_text(), "full content");
    }

    #[test]
    fn body_text_falls_back_to_preview_when_body_empty() {
        let msg = EmailMessage {
            id: "m1".into(),
            subject: None,
            from: None,
            body_preview: "preview".into(),
            body: Some(ItemBody {
                content_type: "text".into(),
                content: String::new(),
            }),
            received_date_time: None,
            is_read: true,
        };
        assert_eq!(msg.body_text(), "preview");
    }

    #[test]
    fn email_message_serde_round_trip() {
        let body: serde_json::Value = serde_json::from_str(GRAPH_LIST_JSON).unwrap();
        let messages: Vec<EmailMessage> =
            serde_json::from_value(body.get("value").cloned().unwrap()).unwrap();

        let json = serde_json::to_string(&messages[0]).unwrap();
        let back: EmailMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "AAMkAGI1");
        assert_eq!(back.sender_address(), "alice@example.com");
    }
}
