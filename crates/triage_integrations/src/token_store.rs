//! On-disk persistence for the OAuth token.
//!
//! A single JSON file holds the current account's token. Its presence (with a
//! usable access or refresh token) is the service's "already authenticated"
//! signal. Writes go through a temp file + rename so a crash never leaves a
//! half-written token behind, and the file is chmod 0600 on unix.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::oauth::OAuthToken;

/// Refuse tokens that expire within this window, so a request started now
/// does not outlive its credential.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Serialized token data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Whether the access token is past (or within the margin of) its expiry.
    /// Tokens without expiry information are treated as still valid.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() >= at - chrono::Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }
}

/// Token storage bound to one file path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a token, creating parent directories as needed.
    pub fn save(&self, token: &OAuthToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create token dir: {}", parent.display()))?;
        }

        let stored = StoredToken {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token.expires_at,
        };
        let json = serde_json::to_string_pretty(&stored)?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)
            .with_context(|| format!("failed to write token file: {}", tmp_path.display()))?;
        set_file_permissions_0600(&tmp_path)?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename token file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), "stored token");
        Ok(())
    }

    /// Load the persisted token, if any.
    pub fn load(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read token file: {}", self.path.display()))?;
        let token: StoredToken =
            serde_json::from_str(&json).context("failed to parse token file")?;
        Ok(Some(token))
    }

    /// Delete the persisted token. Returns `true` if one existed.
    pub fn delete(&self) -> Result<bool> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to delete token file: {}", self.path.display()))?;
            debug!(path = %self.path.display(), "deleted token");
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(unix)]
fn set_file_permissions_0600(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, perms)
        .with_context(|| format!("failed to set permissions: {}", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions_0600(_path: &Path) -> Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token(expires_in_secs: i64) -> OAuthToken {
        OAuthToken {
            access_token: "access-123".into(),
            refresh_token: Some("refresh-456".into()),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(expires_in_secs)),
            token_type: "Bearer".into(),
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::new(tmp.path().join("tokens.json"));

        store.save(&sample_token(3600)).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.access_token, "access-123");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh-456"));
        assert!(loaded.expires_at.is_some());
    }

    #[test]
    fn load_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::new(tmp.path().join("tokens.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::new(tmp.path().join("deep").join("nested").join("tokens.json"));
        store.save(&sample_token(3600)).unwrap();
        assert!(store.load().unwrap().is_some());
    }

    #[test]
    fn delete_existing_returns_true() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::new(tmp.path().join("tokens.json"));
        store.save(&sample_token(3600)).unwrap();

        assert!(store.delete().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn delete_missing_returns_false() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::new(tmp.path().join("tokens.json"));
        assert!(!store.delete().unwrap());
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_panic() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.json");
        fs::write(&path, "NOT JSON {{{").unwrap();

        let store = TokenStore::new(path);
        assert!(store.load().is_err());
    }

    #[test]
    fn expiry_margin_applies() {
        let soon = StoredToken {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(60)),
        };
        assert!(soon.is_expired(), "token inside the margin counts as expired");

        let later = StoredToken {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(3600)),
        };
        assert!(!later.is_expired());
    }

    #[test]
    fn no_expiry_means_not_expired() {
        let token = StoredToken {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: None,
        };
        assert!(!token.is_expired());
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::new(tmp.path().join("tokens.json"));
        store.save(&sample_token(3600)).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn save_overwrites_previous_token() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::new(tmp.path().join("tokens.json"));
        store.save(&sample_token(3600)).unwrap();

        let mut second = sample_token(7200);
        second.access_token = "access-789".into();
        store.save(&second).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access-789");
    }
}
