//! OAuth 2.0 client for the authorization code + PKCE flow.
//!
//! Stateless with respect to individual logins: [`OAuthClient::begin_authorization`]
//! returns the URL, CSRF state, and PKCE verifier as a value the caller stores
//! in its own session, and [`OAuthClient::exchange_code`] takes the verifier
//! back when the redirect arrives. This keeps one client usable across many
//! concurrent user flows.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

use crate::token_store::TokenStore;

/// Applied to every request against the token endpoint.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Configuration ──────────────────────────────────────────────────

/// Configuration required to run an OAuth 2.0 flow.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Configuration for a Microsoft identity platform (Azure AD) tenant.
    pub fn microsoft(
        tenant_id: &str,
        client_id: String,
        client_secret: Option<String>,
        redirect_uri: String,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            auth_url: format!(
                "https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/authorize"
            ),
            token_url: format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token"),
            redirect_uri,
            scopes,
        }
    }

    /// Scopes for reading and sending mail through Microsoft Graph, plus
    /// `offline_access` so the token endpoint issues a refresh token.
    pub fn graph_mail_scopes() -> Vec<String> {
        vec![
            "https://graph.microsoft.com/Mail.ReadWrite".into(),
            "https://graph.microsoft.com/Mail.Send".into(),
            "offline_access".into(),
        ]
    }
}

// ── Token ──────────────────────────────────────────────────────────

/// An OAuth 2.0 token returned by the authorization server.
#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub token_type: String,
}

/// Raw JSON shape returned by the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
}

// ── PKCE helpers ───────────────────────────────────────────────────

/// Generate a cryptographically random code verifier (43-128 unreserved characters).
fn generate_code_verifier() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
    let mut rng = rand::rng();
    let len = rng.random_range(43..=128);
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Compute the S256 code challenge: BASE64URL(SHA256(code_verifier)).
fn compute_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state string for CSRF protection.
fn generate_state() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Percent-encode a query parameter value.
fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

// ── Client ─────────────────────────────────────────────────────────

/// Everything the caller must remember between initiating a login and
/// handling the redirect callback.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

/// OAuth 2.0 client that drives the authorization code + PKCE flow.
pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl OAuthClient {
    /// Create a new OAuth client from the given configuration.
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Build the authorization URL the user should visit, with a fresh PKCE
    /// verifier and CSRF state. The returned value must be stored by the
    /// caller and handed back to [`exchange_code`](Self::exchange_code).
    pub fn begin_authorization(&self) -> AuthorizationRequest {
        let state = generate_state();
        let code_verifier = generate_code_verifier();
        let challenge = compute_code_challenge(&code_verifier);
        let scope = self.config.scopes.join(" ");

        let url = format!(
            "{}?response_type=code\
             &client_id={}\
             &redirect_uri={}\
             &scope={}\
             &state={}\
             &code_challenge={}\
             &code_challenge_method=S256",
            self.config.auth_url,
            urlencode(&self.config.client_id),
            urlencode(&self.config.redirect_uri),
            urlencode(&scope),
            urlencode(&state),
            urlencode(&challenge),
        );

        debug!(url = %url, "built authorization URL");
        AuthorizationRequest {
            url,
            state,
            code_verifier,
        }
    }

    /// Exchange an authorization code (plus the verifier issued alongside it)
    /// for tokens.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<OAuthToken> {
        let mut params = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("client_id", self.config.client_id.clone()),
            ("code_verifier", code_verifier.to_string()),
        ];

        if let Some(ref secret) = self.config.client_secret {
            params.push(("client_secret", secret.clone()));
        }

        let resp = self
            .client
            .post(&self.config.token_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&params)
            .send()
            .await
            .context("token exchange request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("token exchange failed ({}): {}", status, body);
        }

        let raw: TokenResponse = resp
            .json()
            .await
            .context("failed to parse token response")?;
        Ok(to_oauth_token(raw))
    }

    /// Refresh an expired token using the refresh_token grant.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthToken> {
        let mut params = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
            ("client_id", self.config.client_id.clone()),
        ];

        if let Some(ref secret) = self.config.client_secret {
            params.push(("client_secret", secret.clone()));
        }

        let resp = self
            .client
            .post(&self.config.token_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&params)
            .send()
            .await
            .context("token refresh request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("token refresh failed ({}): {}", status, body);
        }

        let raw: TokenResponse = resp
            .json()
            .await
            .context("failed to parse refresh response")?;

        let mut token = to_oauth_token(raw);
        // Microsoft does not always return the refresh token again.
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }

    /// Return a usable access token from the store, refreshing and
    /// re-persisting it if it has expired. `None` means the user must log in.
    pub async fn access_token_from_store(&self, store: &TokenStore) -> Result<Option<String>> {
        let Some(stored) = store.load()? else {
            return Ok(None);
        };

        if !stored.is_expired() {
            return Ok(Some(stored.access_token));
        }

        let Some(ref refresh) = stored.refresh_token else {
            debug!("stored token expired and has no refresh token");
            return Ok(None);
        };

        match self.refresh_token(refresh).await {
            Ok(fresh) => {
                store.save(&fresh)?;
                Ok(Some(fresh.access_token))
            }
            Err(e) => {
                debug!(error = %e, "token refresh failed");
                Ok(None)
            }
        }
    }
}

/// Convert the raw token response into our domain type.
fn to_oauth_token(raw: TokenResponse) -> OAuthToken {
    let expires_at = raw
        .expires_in
        .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

    OAuthToken {
        access_token: raw.access_token,
        refresh_token: raw.refresh_token,
        expires_at,
        token_type: raw.token_type.unwrap_or_else(|| "Bearer".to_string()),
    }
}

// ── Tests ──────────────────────────────────────────────────────────
