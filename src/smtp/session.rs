//! One SMTP transaction over one stream.
//!
//! The session walks a fixed command plan ([`Step`]), waiting after every
//! command for the reply code that step expects. The stream is owned by the
//! session and released exactly once, whatever the outcome.

use super::reply::{ReplyBuffer, ReplyState};
use crate::config::SmtpSettings;
use crate::error::{ConfigError, ConnectionError, MailError};
use crate::message::{EmailMessage, single_line_address};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};

/// Read chunk size for server replies.
const READ_CHUNK: usize = 1024;

/// Position in the command plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Greeting,
    Hello,
    AuthLogin,
    AuthUser,
    AuthPass,
    MailFrom,
    RcptTo,
    Data,
    Message,
    Quit,
}

impl Step {
    /// Reply code that lets the session move past this step.
    pub fn expected_code(self) -> u16 {
        match self {
            Step::Greeting => 220,
            Step::Hello | Step::MailFrom | Step::RcptTo | Step::Message => 250,
            Step::AuthLogin | Step::AuthUser => 334,
            Step::AuthPass => 235,
            Step::Data => 354,
            Step::Quit => 221,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::Greeting => "greeting",
            Step::Hello => "EHLO",
            Step::AuthLogin => "AUTH LOGIN",
            Step::AuthUser => "AUTH username",
            Step::AuthPass => "AUTH password",
            Step::MailFrom => "MAIL FROM",
            Step::RcptTo => "RCPT TO",
            Step::Data => "DATA",
            Step::Message => "message",
            Step::Quit => "QUIT",
        }
    }

    fn is_secret(self) -> bool {
        matches!(self, Step::AuthUser | Step::AuthPass)
    }
}

/// Commands to issue, in order. `None` means "only wait for a reply".
///
/// The three AUTH steps appear only when both username and password are
/// configured. Addresses with line breaks are refused before anything is
/// written.
pub fn command_plan(
    settings: &SmtpSettings,
    message: &EmailMessage,
) -> Result<Vec<(Step, Option<String>)>, ConfigError> {
    let from = single_line_address("from", message.from.clone())?;
    let to = single_line_address("to", message.to.clone())?;

    let mut plan = vec![
        (Step::Greeting, None),
        (Step::Hello, Some(format!("EHLO {}", settings.helo_name))),
    ];

    if let Some((user, pass)) = settings.credentials() {
        plan.push((Step::AuthLogin, Some("AUTH LOGIN".to_string())));
        plan.push((Step::AuthUser, Some(BASE64.encode(user))));
        plan.push((Step::AuthPass, Some(BASE64.encode(pass))));
    }

    plan.extend([
        (Step::MailFrom, Some(format!("MAIL FROM:<{}>", from))),
        (Step::RcptTo, Some(format!("RCPT TO:<{}>", to))),
        (Step::Data, Some("DATA".to_string())),
        (Step::Message, Some(message_block(message))),
        (Step::Quit, Some("QUIT".to_string())),
    ]);
    Ok(plan)
}

/// DATA payload: headers, blank line, dot-stuffed body, terminating `.`.
///
/// The trailing CRLF after the `.` is added when the command is written.
pub fn message_block(message: &EmailMessage) -> String {
    let headers = [
        format!("From: {}", header_value(&message.from)),
        format!("To: {}", header_value(&message.to)),
        format!("Subject: {}", header_value(&message.subject)),
        "MIME-Version: 1.0".to_string(),
        "Content-Type: text/plain; charset=utf-8".to_string(),
    ];
    format!(
        "{}\r\n\r\n{}\r\n.",
        headers.join("\r\n"),
        dot_stuff(&message.text)
    )
}

/// Normalizes line endings to CRLF and doubles a leading `.` on any line,
/// so body content can never end the DATA block early.
fn dot_stuff(body: &str) -> String {
    body.lines()
        .map(|line| {
            if line.starts_with('.') {
                format!(".{}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Header values are single-line.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Exclusive owner of one SMTP connection for one delivery.
pub struct SmtpSession<S> {
    stream: Option<S>,
    replies: ReplyBuffer,
    step: Step,
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            replies: ReplyBuffer::new(),
            step: Step::Greeting,
        }
    }

    /// Deliver `message` over `stream`, finishing before `deadline`.
    ///
    /// On success the stream is shut down gracefully; on any failure,
    /// including the deadline passing, it is dropped without ceremony.
    pub async fn deliver(
        stream: S,
        settings: &SmtpSettings,
        message: &EmailMessage,
        deadline: Instant,
    ) -> Result<(), MailError> {
        let mut session = Self::new(stream);

        let result = match timeout_at(deadline, session.run(settings, message)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout(settings.timeout).into()),
        };

        match &result {
            Ok(()) => session.close(deadline).await,
            Err(e) => {
                tracing::debug!(step = session.step.name(), error = %e, "Aborting SMTP session");
                session.abort();
            }
        }
        result
    }

    async fn run(&mut self, settings: &SmtpSettings, message: &EmailMessage) -> Result<(), MailError> {
        for (step, command) in command_plan(settings, message)? {
            self.step = step;
            if let Some(command) = command {
                self.send(step, &command).await?;
            }
            self.expect(step).await?;
        }
        Ok(())
    }

    async fn send(&mut self, step: Step, command: &str) -> Result<(), MailError> {
        let stream = self.stream.as_mut().ok_or(ConnectionError::Closed)?;

        if step.is_secret() {
            tracing::debug!("C: <credentials>");
        } else if step == Step::Message {
            tracing::debug!(bytes = command.len(), "C: <message>");
        } else {
            tracing::debug!("C: {}", command);
        }

        stream.write_all(command.as_bytes()).await.map_err(io_error)?;
        stream.write_all(b"\r\n").await.map_err(io_error)?;
        stream.flush().await.map_err(io_error)?;
        Ok(())
    }

    async fn expect(&mut self, step: Step) -> Result<String, MailError> {
        let expected = step.expected_code();
        let stream = self.stream.as_mut().ok_or(ConnectionError::Closed)?;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            match self.replies.poll(expected) {
                ReplyState::Accepted(reply) => {
                    tracing::debug!("S: {}", reply.trim_end());
                    return Ok(reply);
                }
                ReplyState::Rejected(line) => {
                    tracing::debug!("S: {}", line);
                    return Err(MailError::Protocol {
                        step: step.name(),
                        expected,
                        reply: line,
                    });
                }
                ReplyState::Pending => {}
            }

            let n = stream.read(&mut chunk).await.map_err(io_error)?;
            if n == 0 {
                return Err(ConnectionError::Closed.into());
            }
            self.replies.push(&chunk[..n]);
        }
    }

    /// Graceful teardown after a completed transaction.
    async fn close(&mut self, deadline: Instant) {
        if let Some(mut stream) = self.stream.take() {
            match timeout_at(deadline, stream.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "SMTP stream shutdown failed"),
                Err(_) => tracing::debug!("SMTP stream shutdown timed out"),
            }
        }
    }

    /// Forcible teardown; the stream is dropped without a shutdown.
    fn abort(&mut self) {
        drop(self.stream.take());
    }
}

fn io_error(err: std::io::Error) -> MailError {
    ConnectionError::Io(err.to_string()).into()
}
