//! Transport selection and the HTTP transports.
//!
//! Exactly one transport handles a send. [`TransportConfig::select`] picks
//! it from the settings with a fixed precedence: SendGrid, then the email
//! function webhook, then SMTP.

mod sendgrid;
mod webhook;

pub use sendgrid::SendGridTransport;
pub use webhook::WebhookTransport;

use crate::config::{MailSettings, SendGridSettings, SmtpSettings, WebhookSettings};
use crate::error::{ConfigError, MailError};

/// Transport chosen for one send.
#[derive(Debug, Clone)]
pub enum TransportConfig {
    SendGrid(SendGridSettings),
    Webhook(WebhookSettings),
    Smtp(SmtpSettings),
}

impl TransportConfig {
    /// Picks the highest-precedence configured transport.
    ///
    /// Lower-precedence settings are ignored, never combined.
    pub fn select(settings: &MailSettings) -> Result<Self, ConfigError> {
        if let Some(sendgrid) = &settings.sendgrid {
            return Ok(Self::SendGrid(sendgrid.clone()));
        }
        if let Some(webhook) = &settings.webhook {
            return Ok(Self::Webhook(webhook.clone()));
        }
        if let Some(smtp) = &settings.smtp {
            return Ok(Self::Smtp(smtp.clone()));
        }
        Err(ConfigError::NoTransport)
    }

    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendGrid(_) => "sendgrid",
            Self::Webhook(_) => "webhook",
            Self::Smtp(_) => "smtp",
        }
    }
}

/// Turns a non-2xx response into `MailError::Http`, keeping the body text.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<(), MailError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(MailError::Http {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretString;

    fn sendgrid() -> SendGridSettings {
        SendGridSettings {
            api_key: SecretString::new("SG.key".to_string()),
            api_url: crate::config::DEFAULT_SENDGRID_API_URL.to_string(),
        }
    }

    fn webhook() -> WebhookSettings {
        WebhookSettings {
            url: "https://functions.example.com/send-email".to_string(),
            key: None,
        }
    }

    #[test]
    fn sendgrid_wins_over_everything() {
        let settings = MailSettings {
            sendgrid: Some(sendgrid()),
            webhook: Some(webhook()),
            smtp: Some(SmtpSettings::new("mail.example.com")),
            ..Default::default()
        };
        let selected = TransportConfig::select(&settings).unwrap();
        assert!(matches!(selected, TransportConfig::SendGrid(_)));
        assert_eq!(selected.kind(), "sendgrid");
    }

    #[test]
    fn webhook_wins_over_smtp() {
        let settings = MailSettings {
            webhook: Some(webhook()),
            smtp: Some(SmtpSettings::new("mail.example.com")),
            ..Default::default()
        };
        let selected = TransportConfig::select(&settings).unwrap();
        assert!(matches!(selected, TransportConfig::Webhook(_)));
        assert_eq!(selected.kind(), "webhook");
    }

    #[test]
    fn smtp_alone_is_selected() {
        let settings = MailSettings {
            smtp: Some(SmtpSettings::new("mail.example.com")),
            ..Default::default()
        };
        match TransportConfig::select(&settings).unwrap() {
            TransportConfig::Smtp(smtp) => assert_eq!(smtp.host, "mail.example.com"),
            other => panic!("Expected Smtp, got {:?}", other),
        }
    }

    #[test]
    fn nothing_configured_is_an_error() {
        let err = TransportConfig::select(&MailSettings::default()).unwrap_err();
        assert_eq!(err, ConfigError::NoTransport);
    }

    #[test]
    fn selection_from_environment_follows_precedence() {
        let settings = MailSettings::from_lookup(|key| match key {
            "EMAIL_FUNCTION_URL" => Some("https://functions.example.com/send".to_string()),
            "SMTP_HOST" => Some("mail.example.com".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(TransportConfig::select(&settings).unwrap().kind(), "webhook");
    }
}
