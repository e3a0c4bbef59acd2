//! Outgoing email message and its normalization.
//!
//! A caller hands over an [`EmailRequest`] with whatever it knows; the
//! transports only ever see a fully populated [`EmailMessage`].

use crate::config::MailSettings;
use crate::error::ConfigError;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

/// Raw message request, before normalization.
#[derive(Debug, Clone, Default)]
pub struct EmailRequest {
    pub to: Option<String>,
    /// Explicit sender; falls back to configuration when absent.
    pub from: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
}

/// Normalized message accepted by every transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    /// Always present; derived from `html` when the caller gave none.
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl EmailMessage {
    /// Validates `request` and fills in the sender and plain-text body.
    ///
    /// # Errors
    ///
    /// * `ConfigError::MissingField` - `to`, `subject`, or both bodies missing
    /// * `ConfigError::NoSender` - no sender resolves from the request or settings
    /// * `ConfigError::Invalid` - `to` or `from` spans more than one line
    pub fn normalize(request: EmailRequest, settings: &MailSettings) -> Result<Self, ConfigError> {
        let to = present(request.to).ok_or(ConfigError::MissingField("to"))?;
        let to = single_line_address("to", to)?;
        let subject = present(request.subject).ok_or(ConfigError::MissingField("subject"))?;
        let from = settings
            .senders
            .resolve(request.from.as_deref())
            .ok_or(ConfigError::NoSender)?;
        let from = single_line_address("from", from)?;

        let html = present(request.html);
        let text = match (present(request.text), &html) {
            (Some(text), _) => text,
            (None, Some(html)) => strip_tags(html),
            (None, None) => return Err(ConfigError::MissingField("text or html")),
        };

        Ok(Self {
            to,
            from,
            subject,
            text,
            html,
        })
    }
}

/// Plain-text rendition of an HTML body: every tag becomes a single space.
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, " ").trim().to_string()
}

/// Rejects addresses containing line breaks; they end up verbatim in
/// `MAIL FROM` / `RCPT TO` command lines.
pub(crate) fn single_line_address(key: &'static str, address: String) -> Result<String, ConfigError> {
    if address.contains(['\r', '\n']) {
        return Err(ConfigError::Invalid {
            key,
            message: "address must not contain line breaks".to_string(),
        });
    }
    Ok(address.trim().to_string())
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
