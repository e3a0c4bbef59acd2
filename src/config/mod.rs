//! Configuration loading for stockmail.
//!
//! Settings come from environment variables (or any lookup function, which
//! keeps tests away from the process environment). Secrets are wrapped in
//! [`SecretString`] so they never show up in logs.

mod env;
mod secret;
mod types;

// Re-exports publics
pub use secret::SecretString;
pub use types::{
    DEFAULT_HELO_NAME, DEFAULT_SENDGRID_API_URL, DEFAULT_SMTP_PORT, DEFAULT_SMTP_TIMEOUT,
    DEFAULT_SMTPS_PORT, ENV_ALERT_RECIPIENT, ENV_EMAIL_FROM, ENV_FUNCTION_KEY, ENV_FUNCTION_URL,
    ENV_SENDGRID_API_KEY, ENV_SENDGRID_API_URL, ENV_SENDGRID_FROM, ENV_SMTP_FROM,
    ENV_SMTP_HELO_NAME, ENV_SMTP_HOST, ENV_SMTP_PASS, ENV_SMTP_PORT, ENV_SMTP_REJECT_UNAUTHORIZED,
    ENV_SMTP_SECURE, ENV_SMTP_TIMEOUT_MS, ENV_SMTP_USER, MailSettings, SendGridSettings,
    SenderFallbacks, SmtpSettings, WebhookSettings,
};
