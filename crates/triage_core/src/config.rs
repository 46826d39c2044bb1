use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variables the service reads at startup.
const VAR_CLIENT_ID: &str = "CLIENT_ID";
const VAR_CLIENT_SECRET: &str = "CLIENT_SECRET";
const VAR_TENANT_ID: &str = "TENANT_ID";
const VAR_REDIRECT_URI: &str = "REDIRECT_URI";
const VAR_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
const VAR_BIND_ADDR: &str = "BIND_ADDR";
const VAR_TOKEN_PATH: &str = "TOKEN_PATH";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Error raised when the environment is missing or malformed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("environment variable {0} is set but empty")]
    EmptyVar(&'static str),
}

/// Service configuration, loaded once at startup.
///
/// All five credential variables are required; the service refuses to start
/// without them rather than faulting mid-request when one is dereferenced.
#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth application (client) ID from the Azure app registration.
    pub client_id: String,
    /// OAuth client secret. Required: this is a confidential client.
    pub client_secret: String,
    /// Azure AD tenant (directory) ID used to build the authority URLs.
    pub tenant_id: String,
    /// Redirect URI registered for the app; must match the callback route.
    pub redirect_uri: String,
    /// API key for the Gemini classification endpoint.
    pub gemini_api_key: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Where the persisted OAuth token lives. Defaults to
    /// `~/.triage/tokens.json`.
    pub token_path: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// Lets tests exercise every missing-variable path without mutating the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                Some(_) => Err(ConfigError::EmptyVar(name)),
                None => Err(ConfigError::MissingVar(name)),
            }
        };

        let token_path = match lookup(VAR_TOKEN_PATH) {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => Self::default_token_path(),
        };

        Ok(Self {
            client_id: required(VAR_CLIENT_ID)?,
            client_secret: required(VAR_CLIENT_SECRET)?,
            tenant_id: required(VAR_TENANT_ID)?,
            redirect_uri: required(VAR_REDIRECT_URI)?,
            gemini_api_key: required(VAR_GEMINI_API_KEY)?,
            bind_addr: lookup(VAR_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            token_path,
        })
    }

    /// Returns the base config directory: `~/.triage/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".triage"))
    }

    /// Returns the logs directory: `~/.triage/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Default token cache location: `~/.triage/tokens.json`, falling back to
    /// a relative path when no home directory is available.
    fn default_token_path() -> PathBuf {
        Self::base_dir()
            .map(|d| d.join("tokens.json"))
            .unwrap_or_else(|_| PathBuf::from("tokens.json"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
