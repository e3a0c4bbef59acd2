//! Centralized error types for stockmail using thiserror.
//!
//! Every failure of a single send travels through [`MailError`]; the
//! stock update flow has its own [`InventoryError`] because store failures
//! are fatal while alert failures are not.

use std::time::Duration;
use thiserror::Error;

/// Missing or invalid configuration, or an incomplete message.
///
/// Never retried; surfaced to the caller immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("no sender address configured (set EMAIL_FROM, SENDGRID_FROM, SMTP_FROM or SMTP_USER)")]
    NoSender,
    #[error("no alert recipient (pass an override, set STOCK_ALERT_EMAIL, or supply the triggering user)")]
    NoRecipient,
    #[error("no email transport configured (set SENDGRID_API_KEY, EMAIL_FUNCTION_URL or SMTP_HOST)")]
    NoTransport,
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Failures of the underlying byte stream or HTTP connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("connection closed by server")]
    Closed,
    #[error("failed to connect to {address}: {message}")]
    Connect { address: String, message: String },
    #[error("TLS handshake failed: {0}")]
    Tls(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("HTTP request failed: {0}")]
    Request(String),
}

/// Single failure channel for one email send.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("unexpected SMTP reply to {step} (expected {expected}): {reply}")]
    Protocol {
        step: &'static str,
        expected: u16,
        reply: String,
    },
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("HTTP transport returned {status}: {body}")]
    Http { status: u16, body: String },
}

impl MailError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MailError::Config(_) => "config",
            MailError::Protocol { .. } => "protocol",
            MailError::Connection(ConnectionError::Timeout(_)) => "timeout",
            MailError::Connection(_) => "connection",
            MailError::Http { .. } => "http",
        }
    }
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        MailError::Connection(ConnectionError::Request(err.to_string()))
    }
}

/// Errors from the stock store during a batch update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("item '{0}' not found")]
    NotFound(String),
    #[error("stock store failure: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::MissingField("to");
        assert_eq!(err.to_string(), "missing required field: to");

        let err = ConfigError::Invalid {
            key: "SMTP_PORT",
            message: "not a number".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for SMTP_PORT: not a number");
    }

    #[test]
    fn config_error_names_the_settings_to_fix() {
        assert!(ConfigError::NoTransport.to_string().contains("SMTP_HOST"));
        assert!(ConfigError::NoSender.to_string().contains("EMAIL_FROM"));
        assert!(
            ConfigError::NoRecipient
                .to_string()
                .contains("STOCK_ALERT_EMAIL")
        );
    }

    #[test]
    fn protocol_error_carries_reply_line() {
        let err = MailError::Protocol {
            step: "RCPT TO",
            expected: 250,
            reply: "550 mailbox unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected SMTP reply to RCPT TO (expected 250): 550 mailbox unavailable"
        );
        assert_eq!(err.kind(), "protocol");
    }

    #[test]
    fn connection_error_display() {
        let err = ConnectionError::Timeout(Duration::from_millis(15000));
        assert_eq!(err.to_string(), "timed out after 15000ms");

        let err = MailError::from(ConnectionError::Closed);
        assert_eq!(
            err.to_string(),
            "connection error: connection closed by server"
        );
        assert_eq!(err.kind(), "connection");
    }

    #[test]
    fn timeout_has_its_own_kind() {
        let err = MailError::from(ConnectionError::Timeout(Duration::from_secs(1)));
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn http_error_display() {
        let err = MailError::Http {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP transport returned 401: unauthorized");
        assert_eq!(err.kind(), "http");
    }

    #[test]
    fn inventory_error_display() {
        let err = InventoryError::NotFound("A1".to_string());
        assert_eq!(err.to_string(), "item 'A1' not found");

        let err = InventoryError::Store("write conflict".to_string());
        assert_eq!(err.to_string(), "stock store failure: write conflict");
    }
}
