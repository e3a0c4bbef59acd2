//! Delivery engine entry point.
//!
//! [`Mailer`] normalizes a request, selects the transport for this send and
//! dispatches to it. The transport is re-selected on every send, but always
//! from the settings the mailer was built with.

use crate::alert::{StockoutAlert, build_alert_content};
use crate::config::MailSettings;
use crate::error::{ConfigError, MailError};
use crate::message::{EmailMessage, EmailRequest};
use crate::smtp::SmtpTransport;
use crate::transport::{SendGridTransport, TransportConfig, WebhookTransport};
use std::time::Duration;
use tracing::Instrument;

/// Timeout applied to every HTTP transport request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport-selecting email sender.
#[derive(Debug, Clone)]
pub struct Mailer {
    settings: MailSettings,
    client: reqwest::Client,
}

impl Mailer {
    /// Build a mailer with its own HTTP client.
    ///
    /// `settings` is kept as a snapshot: every send selects its transport
    /// from it, never from the current environment. Build a new mailer to
    /// pick up changed configuration.
    pub fn new(settings: MailSettings) -> Result<Self, MailError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self::with_client(settings, client))
    }

    /// Build a mailer around an existing HTTP client.
    pub fn with_client(settings: MailSettings, client: reqwest::Client) -> Self {
        Self { settings, client }
    }

    /// Build a mailer from the process environment.
    ///
    /// The environment is read once, here. Variables changed afterwards are
    /// not seen by this mailer; long-lived callers rebuild it instead.
    pub fn from_env() -> Result<Self, MailError> {
        Self::new(MailSettings::from_env()?)
    }

    pub fn settings(&self) -> &MailSettings {
        &self.settings
    }

    /// Normalize and send one email through the selected transport.
    ///
    /// # Errors
    ///
    /// * `MailError::Config` - incomplete message or no transport configured
    /// * any transport failure, unchanged
    pub async fn send_email(&self, request: EmailRequest) -> Result<(), MailError> {
        let message = EmailMessage::normalize(request, &self.settings)?;
        let transport = TransportConfig::select(&self.settings)?;
        let kind = transport.kind();

        let span = tracing::info_span!("send_email", transport = kind);
        let result = self.dispatch(transport, &message).instrument(span).await;

        match &result {
            Ok(()) => {
                metrics::counter!("stockmail_emails_sent_total", "transport" => kind).increment(1);
            }
            Err(e) => {
                metrics::counter!("stockmail_email_errors_total", "transport" => kind).increment(1);
                tracing::error!(
                    transport = kind,
                    error_kind = e.kind(),
                    error = %e,
                    "Email send failed"
                );
            }
        }
        result
    }

    async fn dispatch(&self, transport: TransportConfig, message: &EmailMessage) -> Result<(), MailError> {
        match transport {
            TransportConfig::SendGrid(settings) => {
                SendGridTransport::new(settings, self.client.clone())
                    .send(message)
                    .await
            }
            TransportConfig::Webhook(settings) => {
                WebhookTransport::new(settings, self.client.clone())
                    .send(message)
                    .await
            }
            TransportConfig::Smtp(settings) => SmtpTransport::new(settings).send(message).await,
        }
    }

    /// Send one alert covering every item in `alert`.
    ///
    /// Returns `Ok(false)` without touching the network when there are no
    /// items, `Ok(true)` once the alert was handed to a transport.
    ///
    /// # Errors
    ///
    /// * `ConfigError::NoRecipient` - no override, no `STOCK_ALERT_EMAIL`, no updater
    /// * anything [`Mailer::send_email`] can return
    pub async fn send_out_of_stock_alert(&self, alert: StockoutAlert) -> Result<bool, MailError> {
        let Some(content) = build_alert_content(&alert.items, alert.updated_by.as_deref()) else {
            tracing::debug!("No stockouts, skipping alert");
            return Ok(false);
        };

        let recipient = self
            .alert_recipient(alert.recipient_override.as_deref(), alert.updated_by.as_deref())
            .ok_or(ConfigError::NoRecipient)?;

        tracing::info!(
            items = alert.items.len(),
            recipient = %recipient,
            "Sending out-of-stock alert"
        );

        self.send_email(EmailRequest {
            to: Some(recipient),
            from: None,
            subject: Some(content.subject),
            text: Some(content.text),
            html: content.html,
        })
        .await?;

        metrics::counter!("stockmail_stockout_alerts_total").increment(1);
        Ok(true)
    }

    /// Override, then configured recipient, then the updater.
    fn alert_recipient(&self, override_to: Option<&str>, updated_by: Option<&str>) -> Option<String> {
        [override_to, self.settings.alert_recipient.as_deref(), updated_by]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|candidate| !candidate.is_empty())
            .map(String::from)
    }
}
