//! Gemini-backed email classifier.
//!
//! Google exposes an OpenAI-compatible endpoint at
//! `generativelanguage.googleapis.com/v1beta/openai`; the classifier sends a
//! single non-streaming chat completion and strictly parses the reply into a
//! [`Label`].

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::label::Label;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemma-3-12b-it";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Classification is a short single-label answer; cap the response tightly.
const MAX_TOKENS: u32 = 16;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors the classifier may return.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited")]
    RateLimit,

    #[error("Invalid API key")]
    InvalidKey,

    #[error("Timeout")]
    Timeout,

    #[error("Classifier error: {0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Closed-label email classifier over the Gemini API.
pub struct GeminiClassifier {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClassifier {
    /// Create a new classifier.
    ///
    /// Pass an empty string for `api_key` to create an unavailable classifier
    /// that returns [`ClassifierError::InvalidKey`] on use.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key: if api_key.is_empty() {
                None
            } else {
                Some(api_key)
            },
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the model name.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Override the base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_available(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Build the instruction given to the model.
    fn build_prompt(email_body: &str) -> String {
        let choices = Label::choices_joined();
        format!(
            "Label the following email using exactly one of the labels {choices}. \
             Your output must be a single label name and nothing else.\n\n\
             Email:\n{email_body}"
        )
    }

    /// Build the JSON request body.
    fn build_body(&self, email_body: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![WireMessage {
                role: "user".into(),
                content: Self::build_prompt(email_body),
            }],
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
        }
    }

    /// Get the API key or return an error.
    fn require_key(&self) -> Result<&str, ClassifierError> {
        self.api_key.as_deref().ok_or(ClassifierError::InvalidKey)
    }

    /// Classify an email body into one of the configured labels.
    ///
    /// Any model output that does not name exactly one label comes back as
    /// [`Label::Unclassified`]; only transport and API failures error.
    pub async fn classify(&self, email_body: &str) -> Result<Label, ClassifierError> {
        let key = self.require_key()?;
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(email_body);

        debug!(url = %url, model = %self.model, "requesting classification");

        let resp = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout
                } else {
                    ClassifierError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ClassifierError::InvalidKey);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClassifierError::RateLimit);
        }
        if status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::GATEWAY_TIMEOUT
        {
            return Err(ClassifierError::Timeout);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Other(format!(
                "Gemini API error {status}: {text}"
            )));
        }

        let data: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| ClassifierError::Other(format!("JSON parse error: {e}")))?;

        let content = data
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ClassifierError::Other("No choices in Gemini response".into()))?;

        let label = Label::from_model_output(&content);
        debug!(raw = %content, label = %label, "classification result");
        Ok(label)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
