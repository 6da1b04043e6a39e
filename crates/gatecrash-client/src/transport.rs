//! Pooled TCP/TLS transport.
//!
//! Connections are keyed by (scheme, authority) and reused while keep-alive
//! holds. TLS certificate verification is disabled on purpose: the targets
//! this tool points at routinely present expired, self-signed, or
//! wrong-name certificates, and declining to talk to them would defeat the
//! scan. Session resumption stays on via rustls' default in-memory client
//! session cache.

use std::{
    collections::HashMap,
    io,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::Duration,
};

use gatecrash_payload::Scheme;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf},
    net::TcpStream,
};
use tokio_rustls::TlsConnector;

use crate::errors::ClientError;

/// A pooled connection: plain TCP or TLS over TCP.
pub(crate) enum Stream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

type PoolKey = (Scheme, String);

/// Keyed idle-connection pool plus the dialing machinery.
pub(crate) struct Transport {
    connector: TlsConnector,
    idle: Mutex<HashMap<PoolKey, Vec<Stream>>>,
    max_per_host: usize,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("max_per_host", &self.max_per_host).finish()
    }
}

impl Transport {
    pub(crate) fn new(max_per_host: usize) -> Self {
        Self {
            connector: TlsConnector::from(Arc::new(insecure_tls_config())),
            idle: Mutex::new(HashMap::new()),
            max_per_host,
        }
    }

    /// Pop an idle connection or dial a new one.
    pub(crate) async fn checkout(
        &self,
        scheme: Scheme,
        authority: &str,
        dial_timeout: Duration,
        proxy: Option<&str>,
    ) -> Result<Stream, ClientError> {
        if let Some(stream) = self.pop_idle(scheme, authority) {
            return Ok(stream);
        }
        self.dial(scheme, authority, dial_timeout, proxy).await
    }

    /// Return a reusable connection to the pool.
    pub(crate) fn checkin(&self, scheme: Scheme, authority: &str, stream: Stream) {
        let Ok(mut idle) = self.idle.lock() else { return };
        let bucket = idle.entry((scheme, authority.to_owned())).or_default();
        if bucket.len() < self.max_per_host {
            bucket.push(stream);
        }
    }

    fn pop_idle(&self, scheme: Scheme, authority: &str) -> Option<Stream> {
        let mut idle = self.idle.lock().ok()?;
        idle.get_mut(&(scheme, authority.to_owned()))?.pop()
    }

    async fn dial(
        &self,
        scheme: Scheme,
        authority: &str,
        dial_timeout: Duration,
        proxy: Option<&str>,
    ) -> Result<Stream, ClientError> {
        let (host, port) = split_authority(authority, scheme);
        let connect_addr = match proxy {
            Some(proxy_authority) => proxy_authority.to_owned(),
            None => format!("{host}:{port}"),
        };

        let tcp = tokio::time::timeout(dial_timeout, TcpStream::connect(&connect_addr))
            .await
            .map_err(|_| ClientError::DialTimeout(dial_timeout))?
            .map_err(ClientError::from_io)?;
        tcp.set_nodelay(true).map_err(ClientError::from_io)?;

        let mut tcp = tcp;
        if proxy.is_some() {
            tokio::time::timeout(dial_timeout, connect_preamble(&mut tcp, &host, port))
                .await
                .map_err(|_| ClientError::DialTimeout(dial_timeout))??;
        }

        match scheme {
            Scheme::Http => Ok(Stream::Plain(tcp)),
            Scheme::Https => {
                let server_name = rustls::pki_types::ServerName::try_from(sni_form(&host))
                    .map_err(|e| ClientError::Tls(format!("bad server name {host}: {e}")))?;
                let tls = tokio::time::timeout(
                    dial_timeout,
                    self.connector.connect(server_name, tcp),
                )
                .await
                .map_err(|_| ClientError::DialTimeout(dial_timeout))?
                .map_err(|e| ClientError::Tls(e.to_string()))?;
                Ok(Stream::Tls(Box::new(tls)))
            },
        }
    }
}

/// `CONNECT host:port` through an HTTP proxy; tunnel established on 2xx.
async fn connect_preamble(
    tcp: &mut TcpStream,
    host: &str,
    port: u16,
) -> Result<(), ClientError> {
    let request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n");
    tcp.write_all(request.as_bytes()).await.map_err(ClientError::from_io)?;

    let mut buf = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        let n = tcp.read(&mut byte).await.map_err(ClientError::from_io)?;
        if n == 0 {
            return Err(ClientError::ProxyConnect { status: 0 });
        }
        buf.push(byte[0]);
        if buf.len() > 8192 {
            return Err(ClientError::ProxyConnect { status: 0 });
        }
    }

    let status = std::str::from_utf8(&buf)
        .ok()
        .and_then(|text| text.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .unwrap_or(0);
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(ClientError::ProxyConnect { status })
    }
}

/// Split `host[:port]`, defaulting the port from the scheme. IPv6 brackets
/// stay on the host.
fn split_authority(authority: &str, scheme: Scheme) -> (String, u16) {
    let search_from = if authority.starts_with('[') {
        authority.find(']').map_or(0, |i| i + 1)
    } else {
        0
    };
    match authority[search_from..].rfind(':') {
        Some(rel) => {
            let idx = search_from + rel;
            match authority[idx + 1..].parse() {
                Ok(port) => (authority[..idx].to_owned(), port),
                Err(_) => (authority.to_owned(), scheme.default_port()),
            }
        },
        None => (authority.to_owned(), scheme.default_port()),
    }
}

/// Host form for SNI: brackets stripped so IPv6 literals parse as IPs.
fn sni_form(host: &str) -> String {
    host.trim_start_matches('[').trim_end_matches(']').to_owned()
}

/// TLS client config with certificate verification disabled and HTTP/1.1
/// ALPN.
fn insecure_tls_config() -> rustls::ClientConfig {
    let mut config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerify::new()))
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    config
}

/// Accepts every certificate. This is the point, not an oversight: the scan
/// must reach origins behind broken TLS.
#[derive(Debug)]
struct NoVerify {
    provider: Arc<rustls::crypto::CryptoProvider>,
}

impl NoVerify {
    fn new() -> Self {
        Self { provider: Arc::new(rustls::crypto::ring::default_provider()) }
    }
}

impl rustls::client::danger::ServerCertVerifier for NoVerify {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_splitting() {
        assert_eq!(split_authority("h", Scheme::Http), ("h".to_owned(), 80));
        assert_eq!(split_authority("h", Scheme::Https), ("h".to_owned(), 443));
        assert_eq!(split_authority("h:8080", Scheme::Http), ("h".to_owned(), 8080));
        assert_eq!(split_authority("[::1]:8443", Scheme::Https), ("[::1]".to_owned(), 8443));
        assert_eq!(split_authority("[::1]", Scheme::Http), ("[::1]".to_owned(), 80));
    }

    #[test]
    fn sni_strips_brackets() {
        assert_eq!(sni_form("[::1]"), "::1");
        assert_eq!(sni_form("example.com"), "example.com");
    }

    #[test]
    fn pool_respects_per_host_cap() {
        let transport = Transport::new(1);
        // Only observable without sockets: checkin beyond the cap drops.
        // Stream construction needs a socket, so this test exercises the
        // bookkeeping through the public checkout path in integration tests;
        // here we just assert the cap is stored.
        assert_eq!(transport.max_per_host, 1);
    }

    #[tokio::test]
    async fn dial_round_trip_over_loopback() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            sock.read_exact(&mut buf).await.unwrap();
            sock.write_all(b"pong").await.unwrap();
        });

        let transport = Transport::new(4);
        let authority = format!("127.0.0.1:{}", addr.port());
        let mut stream = transport
            .checkout(Scheme::Http, &authority, Duration::from_secs(5), None)
            .await
            .unwrap();
        stream.write_all(b"ping").await.unwrap();
        let mut reply = [0u8; 4];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"pong");
        server.await.unwrap();

        // connection goes back to the pool and comes out again
        transport.checkin(Scheme::Http, &authority, stream);
        assert!(transport.pop_idle(Scheme::Http, &authority).is_some());
        assert!(transport.pop_idle(Scheme::Http, &authority).is_none());
    }
}
