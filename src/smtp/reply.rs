//! Reply matching for the SMTP client.
//!
//! Bytes from the server are pushed into a [`ReplyBuffer`] as they arrive;
//! [`ReplyBuffer::poll`] decides whether the buffered reply is complete and
//! whether it carries the code the current step is waiting for.
//!
//! Only the last buffered line decides completion. A reply is complete once
//! that line is terminated and has the final-line shape `NNN text` (or a bare
//! `NNN`). Earlier lines of an accepted reply must be continuation lines with
//! the same code (`NNN-text`), otherwise the reply is rejected.
//!
//! A reply that is still undecided after [`MAX_REPLY_BYTES`] is rejected.

/// Upper bound on buffered bytes for a single reply.
pub const MAX_REPLY_BYTES: usize = 64 * 1024;

/// Outcome of inspecting the buffered reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyState {
    /// More bytes are needed.
    Pending,
    /// The expected code arrived; carries the whole reply text.
    Accepted(String),
    /// A complete reply with another code; carries the offending line.
    Rejected(String),
}

/// Shape of a single reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReplyLine {
    code: u16,
    last: bool,
}

impl ReplyLine {
    fn parse(line: &str) -> Option<Self> {
        let bytes = line.as_bytes();
        if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return None;
        }
        let last = match bytes.get(3) {
            None | Some(b' ') => true,
            Some(b'-') => false,
            Some(_) => return None,
        };
        let code = bytes[..3]
            .iter()
            .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));
        Some(Self { code, last })
    }
}

/// Accumulates server bytes until a reply can be decided.
#[derive(Debug, Default)]
pub struct ReplyBuffer {
    buffer: Vec<u8>,
}

impl ReplyBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Push raw bytes read from the stream.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Current buffer size in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Inspect the buffer for a reply carrying `expected`.
    ///
    /// The buffer is cleared once a reply is accepted or rejected, so the
    /// next step starts from an empty buffer. An undecided reply larger than
    /// [`MAX_REPLY_BYTES`] is rejected.
    pub fn poll(&mut self, expected: u16) -> ReplyState {
        let state = self.decide(expected);
        if state == ReplyState::Pending && self.buffer.len() > MAX_REPLY_BYTES {
            self.buffer.clear();
            return ReplyState::Rejected(format!("reply exceeded {} bytes", MAX_REPLY_BYTES));
        }
        if state != ReplyState::Pending {
            self.buffer.clear();
        }
        state
    }

    fn decide(&self, expected: u16) -> ReplyState {
        // A trailing partial line is still being received.
        if !self.buffer.ends_with(b"\n") {
            return ReplyState::Pending;
        }

        let text = String::from_utf8_lossy(&self.buffer).into_owned();
        let lines: Vec<&str> = text
            .split(['\r', '\n'])
            .filter(|line| !line.is_empty())
            .collect();

        let Some((last, earlier)) = lines.split_last() else {
            return ReplyState::Pending;
        };

        match ReplyLine::parse(last) {
            Some(ReplyLine { code, last: true }) if code == expected => {
                match earlier
                    .iter()
                    .find(|line| ReplyLine::parse(line) != Some(ReplyLine { code, last: false }))
                {
                    Some(stray) => ReplyState::Rejected((*stray).to_string()),
                    None => ReplyState::Accepted(text.clone()),
                }
            }
            Some(ReplyLine { last: true, .. }) => ReplyState::Rejected((*last).to_string()),
            _ => ReplyState::Pending,
        }
    }
}
