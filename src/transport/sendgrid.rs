//! REST email API transport (SendGrid v3 `mail/send`).

use super::check_status;
use crate::config::SendGridSettings;
use crate::error::MailError;
use crate::message::EmailMessage;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

/// Request body for `POST /v3/mail/send`.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

impl<'a> SendRequest<'a> {
    fn from_message(message: &'a EmailMessage) -> Self {
        let mut content = vec![Content {
            kind: "text/plain",
            value: &message.text,
        }];
        if let Some(html) = &message.html {
            content.push(Content {
                kind: "text/html",
                value: html,
            });
        }

        Self {
            personalizations: [Personalization {
                to: [Address { email: &message.to }],
            }],
            from: Address {
                email: &message.from,
            },
            subject: &message.subject,
            content,
        }
    }
}

/// Sends through the SendGrid HTTP API.
pub struct SendGridTransport {
    settings: SendGridSettings,
    client: reqwest::Client,
}

impl SendGridTransport {
    pub fn new(settings: SendGridSettings, client: reqwest::Client) -> Self {
        Self { settings, client }
    }

    /// One POST; any non-2xx status is `MailError::Http`.
    pub async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(self.settings.api_key.expose())
            .json(&SendRequest::from_message(message))
            .send()
            .await?;

        check_status(response).await?;
        tracing::info!(to = %message.to, "Email accepted by SendGrid");
        Ok(())
    }
}

impl std::fmt::Debug for SendGridTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridTransport")
            .field("api_url", &self.settings.api_url)
            .field("api_key", &self.settings.api_key)
            .finish()
    }
}
