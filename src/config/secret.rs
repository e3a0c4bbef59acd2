//! Secret string wrapper that never appears in logs.

/// Wrapper for credentials (API keys, function keys, SMTP passwords).
///
/// The `Debug` and `Display` implementations always show `[REDACTED]`.
///
/// # Example
///
/// ```
/// use stockmail::config::SecretString;
///
/// let secret = SecretString::new("SG.live-key".to_string());
/// assert_eq!(format!("{:?}", secret), "[REDACTED]");
/// assert_eq!(secret.expose(), "SG.live-key");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new `SecretString` from a regular `String`.
    pub fn new(s: String) -> Self {
        SecretString(s)
    }

    /// Exposes the underlying secret value.
    ///
    /// Only pass the result to the wire (auth headers, AUTH LOGIN), never to
    /// a logging macro.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}
