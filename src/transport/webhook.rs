//! Email function webhook transport.
//!
//! The normalized message is posted as JSON, unchanged.

use super::check_status;
use crate::config::WebhookSettings;
use crate::error::MailError;
use crate::message::EmailMessage;

/// Sends by posting the message to a serverless email function.
pub struct WebhookTransport {
    settings: WebhookSettings,
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new(settings: WebhookSettings, client: reqwest::Client) -> Self {
        Self { settings, client }
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let mut request = self.client.post(&self.settings.url).json(message);
        if let Some(key) = &self.settings.key {
            request = request.bearer_auth(key.expose());
        }

        let response = request.send().await?;
        check_status(response).await?;
        tracing::info!(to = %message.to, "Email accepted by email function");
        Ok(())
    }
}

impl std::fmt::Debug for WebhookTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookTransport")
            .field("url", &self.settings.url)
            .field("key", &self.settings.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretString;
    use crate::error::ConnectionError;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        EmailMessage {
            to: "ops@example.com".to_string(),
            from: "shop@example.com".to_string(),
            subject: "Out of stock: Widget (A1)".to_string(),
            text: "Widget".to_string(),
            html: Some("<p>Widget</p>".to_string()),
        }
    }

    #[tokio::test]
    async fn posts_message_json_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-email"))
            .and(header("authorization", "Bearer fn-key"))
            .and(body_json(json!({
                "to": "ops@example.com",
                "from": "shop@example.com",
                "subject": "Out of stock: Widget (A1)",
                "text": "Widget",
                "html": "<p>Widget</p>"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = WebhookTransport::new(
            WebhookSettings {
                url: format!("{}/send-email", server.uri()),
                key: Some(SecretString::new("fn-key".to_string())),
            },
            reqwest::Client::new(),
        );
        transport.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn omits_authorization_without_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let transport = WebhookTransport::new(
            WebhookSettings {
                url: server.uri(),
                key: None,
            },
            reqwest::Client::new(),
        );
        transport.send(&message()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn server_error_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let transport = WebhookTransport::new(
            WebhookSettings {
                url: server.uri(),
                key: None,
            },
            reqwest::Client::new(),
        );
        let err = transport.send(&message()).await.unwrap_err();
        assert!(matches!(err, MailError::Http { status: 500, .. }));
        assert_eq!(err.kind(), "http");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = WebhookTransport::new(
            WebhookSettings {
                url: format!("http://127.0.0.1:{}/send-email", port),
                key: None,
            },
            reqwest::Client::new(),
        );
        let err = transport.send(&message()).await.unwrap_err();
        assert!(matches!(
            err,
            MailError::Connection(ConnectionError::Request(_))
        ));
    }
}
