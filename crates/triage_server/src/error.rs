use axum::http::{header::HeaderName, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::pages;

/// Stable machine-readable error code, carried in this response header
/// alongside the human-readable HTML body.
pub static ERROR_CODE_HEADER: HeaderName = HeaderName::from_static("x-error-code");

/// Request-level failures, one variant per phase so callers can tell a
/// client-correctable 400 from a server-side 500.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("no login attempt is in progress; start again from the login page")]
    MissingFlow,

    #[error("authorization state did not match the pending login attempt")]
    StateMismatch,

    #[error("the identity provider rejected the login: {0}")]
    ProviderDenied(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("failed to fetch mail: {0}")]
    MailFetch(String),

    #[error("classification failed: {0}")]
    Classify(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFlow | Self::StateMismatch | Self::ProviderDenied(_) | Self::Exchange(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MailFetch(_) | Self::Classify(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFlow => "missing_flow",
            Self::StateMismatch => "state_mismatch",
            Self::ProviderDenied(_) => "provider_denied",
            Self::Exchange(_) => "exchange_failed",
            Self::MailFetch(_) => "mail_fetch",
            Self::Classify(_) => "classify",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }

        let body = Html(pages::error_page(status, &self.to_string()));
        (status, [(ERROR_CODE_HEADER.clone(), self.code())], body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
