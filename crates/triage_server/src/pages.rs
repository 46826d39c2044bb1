//! Minimal HTML fragments with navigation links between the endpoints.

use axum::http::StatusCode;
use triage_ai::Label;

/// Escape text destined for an HTML body or attribute value.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>{}</title></head>\n<body>\n{}\n</body></html>\n",
        escape(title),
        body
    )
}

pub fn login_page(auth_url: &str) -> String {
    page(
        "Login",
        &format!(
            "<h1>Login</h1>\n<p><a href=\"{}\">Click here to login</a></p>",
            escape(auth_url)
        ),
    )
}

pub fn already_logged_in_page() -> String {
    page(
        "Already logged in",
        "<h1>You are already logged in</h1>\n\
         <p><a href=\"/inbox/first\">Read the first email</a> | \
         <a href=\"/logout\">Logout</a></p>",
    )
}

pub fn callback_success_page() -> String {
    page(
        "Login successful",
        "<h1>Login successful</h1>\n\
         <p><a href=\"/inbox/first\">Read the first email</a></p>",
    )
}

pub fn not_logged_in_page() -> String {
    page(
        "Not logged in",
        "<h1>You are not logged in</h1>\n<p><a href=\"/login\">Login</a></p>",
    )
}

pub fn inbox_empty_page() -> String {
    page(
        "Inbox",
        "<h1>No emails found</h1>\n<p><a href=\"/logout\">Logout</a></p>",
    )
}

pub fn email_page(subject: &str, sender: &str, label: Label) -> String {
    page(
        "First email",
        &format!(
            "<h1>First email</h1>\n\
             <p>Subject: {}</p>\n\
             <p>Sender: {}</p>\n\
             <p>Label: {}</p>\n\
             <p><a href=\"/logout\">Logout</a></p>",
            escape(subject),
            escape(sender),
            label
        ),
    )
}

pub fn logged_out_page() -> String {
    page(
        "Logged out",
        "<h1>Logged out</h1>\n<p><a href=\"/login\">Login again</a></p>",
    )
}

pub fn nothing_to_log_out_page() -> String {
    page(
        "Logout",
        "<h1>Nothing to log out</h1>\n<p><a href=\"/login\">Login</a></p>",
    )
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    page(
        "Error",
        &format!(
            "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/login\">Back to login</a></p>",
            status,
            escape(message)
        ),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
