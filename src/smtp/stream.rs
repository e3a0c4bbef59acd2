//! Byte stream to the SMTP server, plaintext or implicit TLS.
//!
//! [`MailStream`] implements `AsyncRead + AsyncWrite` for both cases so the
//! session code never needs to know which one it is talking through.

use crate::config::SmtpSettings;
use crate::error::ConnectionError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

/// Connection to the SMTP server.
#[derive(Debug)]
pub enum MailStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl MailStream {
    /// Open the stream described by `settings`: implicit TLS when
    /// `secure` is set, plaintext otherwise.
    pub async fn connect(settings: &SmtpSettings) -> Result<Self, ConnectionError> {
        if settings.secure {
            Self::tls(&settings.host, settings.port, settings.reject_unauthorized).await
        } else {
            Self::plain(&settings.host, settings.port).await
        }
    }

    /// Open a plaintext TCP stream.
    pub async fn plain(host: &str, port: u16) -> Result<Self, ConnectionError> {
        let tcp = open_tcp(host, port).await?;
        tracing::debug!(host, port, "SMTP connected (plaintext)");
        Ok(Self::Plain(tcp))
    }

    /// Open a TCP stream and complete a TLS handshake on it right away.
    ///
    /// With `verify == false` any server certificate is accepted, but
    /// handshake signatures are still checked.
    pub async fn tls(host: &str, port: u16, verify: bool) -> Result<Self, ConnectionError> {
        let config = client_config(verify)?;
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ConnectionError::Tls(format!("invalid server name '{}': {}", host, e)))?;

        let tcp = open_tcp(host, port).await?;
        let stream = TlsConnector::from(Arc::new(config))
            .connect(server_name, tcp)
            .await
            .map_err(|e| ConnectionError::Tls(e.to_string()))?;

        tracing::debug!(host, port, verify, "SMTP connected (TLS)");
        Ok(Self::Tls(Box::new(stream)))
    }

    /// Whether the stream is TLS-protected.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, MailStream::Tls(_))
    }
}

async fn open_tcp(host: &str, port: u16) -> Result<TcpStream, ConnectionError> {
    TcpStream::connect((host, port))
        .await
        .map_err(|e| ConnectionError::Connect {
            address: format!("{}:{}", host, port),
            message: e.to_string(),
        })
}

fn client_config(verify: bool) -> Result<ClientConfig, ConnectionError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| ConnectionError::Tls(e.to_string()))?;

    let config = if verify {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        tracing::warn!("TLS certificate verification disabled for SMTP");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
            .with_no_client_auth()
    };
    Ok(config)
}

/// Verifier used when certificate validation is turned off.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

impl AsyncRead for MailStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MailStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            MailStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MailStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MailStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            MailStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MailStream::Plain(s) => Pin::new(s).poll_flush(cx),
            MailStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MailStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            MailStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
