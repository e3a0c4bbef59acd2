//! Core configuration types and loading.

use super::env::{parse_flag, parse_millis, parse_port, read_var};
use super::secret::SecretString;
use crate::error::ConfigError;
use std::time::Duration;

/// REST email API key; its presence selects the SendGrid transport.
pub const ENV_SENDGRID_API_KEY: &str = "SENDGRID_API_KEY";
/// Optional override of the SendGrid endpoint.
pub const ENV_SENDGRID_API_URL: &str = "SENDGRID_API_URL";
/// SendGrid-specific sender address.
pub const ENV_SENDGRID_FROM: &str = "SENDGRID_FROM";
/// Webhook function URL; its presence selects the webhook transport.
pub const ENV_FUNCTION_URL: &str = "EMAIL_FUNCTION_URL";
/// Optional bearer token for the webhook function.
pub const ENV_FUNCTION_KEY: &str = "EMAIL_FUNCTION_KEY";
/// SMTP host; its presence selects the built-in SMTP client.
pub const ENV_SMTP_HOST: &str = "SMTP_HOST";
pub const ENV_SMTP_PORT: &str = "SMTP_PORT";
pub const ENV_SMTP_SECURE: &str = "SMTP_SECURE";
pub const ENV_SMTP_USER: &str = "SMTP_USER";
pub const ENV_SMTP_PASS: &str = "SMTP_PASS";
pub const ENV_SMTP_FROM: &str = "SMTP_FROM";
pub const ENV_SMTP_HELO_NAME: &str = "SMTP_HELO_NAME";
pub const ENV_SMTP_TIMEOUT_MS: &str = "SMTP_TIMEOUT_MS";
pub const ENV_SMTP_REJECT_UNAUTHORIZED: &str = "SMTP_TLS_REJECT_UNAUTHORIZED";
/// Generic sender address, used by every transport.
pub const ENV_EMAIL_FROM: &str = "EMAIL_FROM";
/// Recipient of out-of-stock alerts.
pub const ENV_ALERT_RECIPIENT: &str = "STOCK_ALERT_EMAIL";

pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";
/// Submission port used when neither a port nor implicit TLS is configured.
pub const DEFAULT_SMTP_PORT: u16 = 587;
/// Implicit TLS port.
pub const DEFAULT_SMTPS_PORT: u16 = 465;
pub const DEFAULT_HELO_NAME: &str = "localhost";
/// Bound on a whole SMTP session, connect to final acknowledgment.
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Snapshot of the mail-related process configuration.
///
/// Each transport block is `Some` only when the variable that selects it is
/// set; the remaining fields of a block fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct MailSettings {
    /// Candidate sender addresses, in resolution order.
    pub senders: SenderFallbacks,
    /// Configured recipient for out-of-stock alerts.
    pub alert_recipient: Option<String>,
    pub sendgrid: Option<SendGridSettings>,
    pub webhook: Option<WebhookSettings>,
    pub smtp: Option<SmtpSettings>,
}

/// Sender addresses consulted after an explicit `from`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderFallbacks {
    pub email_from: Option<String>,
    pub sendgrid_from: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_user: Option<String>,
}

impl SenderFallbacks {
    /// Resolves the sender: explicit, then `EMAIL_FROM`, then the provider
    /// specific addresses, then the SMTP username.
    pub fn resolve(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.email_from.clone())
            .or_else(|| self.sendgrid_from.clone())
            .or_else(|| self.smtp_from.clone())
            .or_else(|| self.smtp_user.clone())
    }
}

/// REST email API settings.
#[derive(Debug, Clone)]
pub struct SendGridSettings {
    pub api_key: SecretString,
    pub api_url: String,
}

/// Webhook function settings.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: String,
    /// Sent as `Authorization: Bearer <key>` when present.
    pub key: Option<SecretString>,
}

/// SMTP server settings for the built-in client.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Implicit TLS from the first byte (no STARTTLS).
    pub secure: bool,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub helo_name: String,
    pub timeout: Duration,
    /// Certificate validation for `secure` connections.
    pub reject_unauthorized: bool,
}

impl SmtpSettings {
    /// Settings for `host` with every other option at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SMTP_PORT,
            secure: false,
            username: None,
            password: None,
            helo_name: DEFAULT_HELO_NAME.to_string(),
            timeout: DEFAULT_SMTP_TIMEOUT,
            reject_unauthorized: true,
        }
    }

    /// Username and password, only when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.expose())),
            _ => None,
        }
    }

    /// `host:port` as used for connecting and logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("helo_name", &self.helo_name)
            .field("timeout", &self.timeout)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .finish()
    }
}

impl MailSettings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let senders = SenderFallbacks {
            email_from: read_var(&lookup, ENV_EMAIL_FROM),
            sendgrid_from: read_var(&lookup, ENV_SENDGRID_FROM),
            smtp_from: read_var(&lookup, ENV_SMTP_FROM),
            smtp_user: read_var(&lookup, ENV_SMTP_USER),
        };

        let sendgrid = read_var(&lookup, ENV_SENDGRID_API_KEY).map(|key| SendGridSettings {
            api_key: SecretString::new(key),
            api_url: read_var(&lookup, ENV_SENDGRID_API_URL)
                .unwrap_or_else(|| DEFAULT_SENDGRID_API_URL.to_string()),
        });

        let webhook = read_var(&lookup, ENV_FUNCTION_URL).map(|url| WebhookSettings {
            url,
            key: read_var(&lookup, ENV_FUNCTION_KEY).map(SecretString::new),
        });

        let smtp = match read_var(&lookup, ENV_SMTP_HOST) {
            Some(host) => Some(Self::smtp_from_lookup(&lookup, host)?),
            None => None,
        };

        Ok(Self {
            senders,
            alert_recipient: read_var(&lookup, ENV_ALERT_RECIPIENT),
            sendgrid,
            webhook,
            smtp,
        })
    }

    fn smtp_from_lookup<F>(lookup: &F, host: String) -> Result<SmtpSettings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit_secure = parse_flag(ENV_SMTP_SECURE, read_var(lookup, ENV_SMTP_SECURE))?;
        let port = parse_port(ENV_SMTP_PORT, read_var(lookup, ENV_SMTP_PORT))?.unwrap_or(
            if explicit_secure == Some(true) {
                DEFAULT_SMTPS_PORT
            } else {
                DEFAULT_SMTP_PORT
            },
        );
        let secure = explicit_secure.unwrap_or(port == DEFAULT_SMTPS_PORT);

        let reject_unauthorized = parse_flag(
            ENV_SMTP_REJECT_UNAUTHORIZED,
            read_var(lookup, ENV_SMTP_REJECT_UNAUTHORIZED),
        )?
        .unwrap_or(true);

        Ok(SmtpSettings {
            host,
            port,
            secure,
            username: read_var(lookup, ENV_SMTP_USER),
            password: read_var(lookup, ENV_SMTP_PASS).map(SecretString::new),
            helo_name: read_var(lookup, ENV_SMTP_HELO_NAME)
                .unwrap_or_else(|| DEFAULT_HELO_NAME.to_string()),
            timeout: parse_millis(ENV_SMTP_TIMEOUT_MS, read_var(lookup, ENV_SMTP_TIMEOUT_MS))?
                .unwrap_or(DEFAULT_SMTP_TIMEOUT),
            reject_unauthorized,
        })
    }
}
