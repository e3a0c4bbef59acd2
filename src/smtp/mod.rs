//! Minimal SMTP client: one message per connection.
//!
//! - [`reply`]: reply buffering and code matching
//! - [`session`]: command plan and the per-connection state machine
//! - [`stream`]: plaintext or implicit-TLS byte stream
//!
//! The whole transaction, connect included, is bounded by a single deadline
//! derived from `SmtpSettings::timeout`.

mod reply;
mod session;
mod stream;

pub use reply::{ReplyBuffer, ReplyState};
pub use session::{SmtpSession, Step, command_plan, message_block};
pub use stream::MailStream;

use crate::config::SmtpSettings;
use crate::error::{ConnectionError, MailError};
use crate::message::EmailMessage;
use tokio::time::{Instant, timeout_at};
use tracing::Instrument;

/// SMTP transport bound to one server configuration.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    settings: SmtpSettings,
}

impl SmtpTransport {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    /// Deliver one message over a fresh connection.
    ///
    /// # Errors
    ///
    /// * `MailError::Connection` - connect, TLS, I/O failure or deadline exceeded
    /// * `MailError::Protocol` - the server answered a step with an unexpected code
    pub async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let settings = &self.settings;
        let span = tracing::info_span!(
            "smtp_send",
            host = %settings.host,
            port = settings.port,
            secure = settings.secure
        );

        self.deliver(message).instrument(span).await
    }

    async fn deliver(&self, message: &EmailMessage) -> Result<(), MailError> {
        let settings = &self.settings;
        let deadline = Instant::now() + settings.timeout;

        let stream = timeout_at(deadline, MailStream::connect(settings))
            .await
            .map_err(|_| ConnectionError::Timeout(settings.timeout))??;
        tracing::debug!(encrypted = stream.is_encrypted(), "SMTP stream open");

        SmtpSession::deliver(stream, settings, message, deadline).await?;
        tracing::info!(to = %message.to, "Email delivered via SMTP");
        Ok(())
    }
}
