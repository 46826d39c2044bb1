//! HTTP handlers for the four OAuth/mail endpoints.

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use triage_core::{PendingFlow, SessionStore};

use crate::error::AppError;
use crate::pages;
use crate::state::AppState;

const SESSION_COOKIE: &str = "sid";

/// Build the application router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/auth/callback", get(auth_callback))
        .route("/inbox/first", get(first_email))
        .route("/logout", get(logout))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the session for this request, minting an id (and cookie) if the
/// client does not have one yet.
fn ensure_session(state: &AppState, jar: CookieJar) -> (String, CookieJar) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let sid = cookie.value().to_string();
        state.sessions.ensure(&sid);
        return (sid, jar);
    }

    let sid = SessionStore::new_session_id();
    state.sessions.ensure(&sid);
    let cookie = Cookie::build((SESSION_COOKIE, sid.clone()))
        .path("/")
        .http_only(true)
        .build();
    (sid, jar.add(cookie))
}

/// Whether this session already has a usable login: either it authenticated
/// earlier, or a token survives in the on-disk store.
fn already_logged_in(state: &AppState, sid: &str) -> bool {
    state.sessions.is_authenticated(sid) || state.tokens.load().ok().flatten().is_some()
}

// ---------------------------------------------------------------------------
// GET /login
// ---------------------------------------------------------------------------

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let (sid, jar) = ensure_session(&state, jar);

    // Idempotent short-circuit: do not mint a new flow over a live login.
    if already_logged_in(&state, &sid) {
        debug!(sid = %sid, "login requested but already authenticated");
        return Ok((jar, Html(pages::already_logged_in_page())));
    }

    let request = state.oauth.begin_authorization();
    state.sessions.set_pending(
        &sid,
        PendingFlow {
            auth_url: request.url.clone(),
            state: request.state,
            code_verifier: request.code_verifier,
        },
    );

    info!(sid = %sid, "login initiated");
    Ok((jar, Html(pages::login_page(&request.url))))
}

// ---------------------------------------------------------------------------
// GET /auth/callback
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn auth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Html<String>), AppError> {
    let (sid, jar) = ensure_session(&state, jar);

    // A persisted token wins over any pending flow: the flow is left alone.
    if state
        .tokens
        .load()
        .map_err(|e| AppError::Internal(e.to_string()))?
        .is_some()
    {
        state.sessions.set_authenticated(&sid, true);
        return Ok((jar, Html(pages::already_logged_in_page())));
    }

    // Single-use: taking the flow here means a replayed callback cannot
    // reach the token exchange a second time.
    let flow = state
        .sessions
        .take_pending(&sid)
        .ok_or(AppError::MissingFlow)?;

    if let Some(error) = params.error {
        let detail = params.error_description.unwrap_or_default();
        return Err(AppError::ProviderDenied(format!("{error} {detail}")));
    }

    match params.state.as_deref() {
        Some(returned) if returned == flow.state => {}
        _ => return Err(AppError::StateMismatch),
    }

    let code = params
        .code
        .ok_or_else(|| AppError::ProviderDenied("authorization response carried no code".into()))?;

    let token = state
        .oauth
        .exchange_code(&code, &flow.code_verifier)
        .await
        .map_err(|e| AppError::Exchange(e.to_string()))?;

    state
        .tokens
        .save(&token)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    state.sessions.set_authenticated(&sid, true);

    info!(sid = %sid, "login completed");
    Ok((jar, Html(pages::callback_success_page())))
}

// ---------------------------------------------------------------------------
// GET /inbox/first
// ---------------------------------------------------------------------------

async fn first_email(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let (sid, jar) = ensure_session(&state, jar);

    let access_token = state
        .oauth
        .access_token_from_store(&state.tokens)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let Some(access_token) = access_token else {
        debug!(sid = %sid, "inbox requested without a usable token");
        return Ok((jar, Html(pages::not_logged_in_page())));
    };

    let client = state.mail_client(&access_token);
    let message = client
        .first_inbox_message()
        .await
        .map_err(|e| AppError::MailFetch(e.to_string()))?;

    let Some(message) = message else {
        return Ok((jar, Html(pages::inbox_empty_page())));
    };

    let label = state
        .classifier
        .classify(message.body_text())
        .await
        .map_err(|e| AppError::Classify(e.to_string()))?;

    info!(sid = %sid, label = %label, "classified first inbox message");
    Ok((
        jar,
        Html(pages::email_page(
            message.subject_or_default(),
            message.sender_address(),
            label,
        )),
    ))
}

// ---------------------------------------------------------------------------
// GET /logout
// ---------------------------------------------------------------------------

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let (sid, jar) = ensure_session(&state, jar);

    let deleted = state
        .tokens
        .delete()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    state.sessions.reset(&sid);

    if deleted {
        info!(sid = %sid, "logged out");
        Ok((jar, Html(pages::logged_out_page())))
    } else {
        debug!(sid = %sid, "logout with nothing persisted");
        Ok((jar, Html(pages::nothing_to_log_out_page())))
    }
}

// ---------------------------------------------------------------------------
// GET /healthz
// ---------------------------------------------------------------------------

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
