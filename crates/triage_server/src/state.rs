use std::sync::Arc;

use triage_ai::GeminiClassifier;
use triage_core::{Config, SessionStore};
use triage_integrations::{OAuthClient, OAuthConfig, OutlookMailClient, TokenStore};

/// Shared state accessible by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub oauth: Arc<OAuthClient>,
    pub tokens: Arc<TokenStore>,
    pub classifier: Arc<GeminiClassifier>,
    /// Overrides the Microsoft Graph base URL (tests point this at a stub).
    pub graph_base_url: Option<String>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let oauth_config = OAuthConfig::microsoft(
            &config.tenant_id,
            config.client_id.clone(),
            Some(config.client_secret.clone()),
            config.redirect_uri.clone(),
            OAuthConfig::graph_mail_scopes(),
        );

        Self {
            sessions: Arc::new(SessionStore::new()),
            oauth: Arc::new(OAuthClient::new(oauth_config)),
            tokens: Arc::new(TokenStore::new(config.token_path.clone())),
            classifier: Arc::new(GeminiClassifier::new(config.gemini_api_key.clone())),
            graph_base_url: None,
        }
    }

    /// Build a Graph mail client for the given access token.
    pub fn mail_client(&self, access_token: &str) -> OutlookMailClient {
        match &self.graph_base_url {
            Some(base) => OutlookMailClient::with_base_url(access_token, base),
            None => OutlookMailClient::new(access_token),
        }
    }
}
