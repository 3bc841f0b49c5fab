// src/probe/tls.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{CryptoProvider, ring};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{self, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tracing::trace;

use super::Prober;
use super::matcher::CertificateFields;
use crate::error::ScanError;
use crate::scan::deadline_after;
use crate::types::{CertMatch, ProbeOutcome, SkipReason};

pub const DEFAULT_TLS_PORT: u16 = 443;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Connects to `address:port`, completes a TLS handshake without chain
/// validation and matches the presented leaf certificate.
pub struct TlsProber {
    connector: TlsConnector,
    port: u16,
    probe_timeout: Duration,
}

enum FetchError {
    Connect(io::Error),
    Handshake(io::Error),
    NoCertificate,
}

impl TlsProber {
    pub fn new(port: u16, probe_timeout: Duration) -> Result<Self> {
        let provider = Arc::new(ring::default_provider());
        let verifier = AcceptAnyCertificate::new(&provider);

        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .context("TLS provider does not support default protocol versions")?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            port,
            probe_timeout,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn fetch_leaf(&self, address: IpAddr) -> Result<Vec<u8>, FetchError> {
        let tcp = TcpStream::connect(SocketAddr::new(address, self.port))
            .await
            .map_err(FetchError::Connect)?;
        tcp.set_nodelay(true).ok();

        let tls = self
            .connector
            .connect(ServerName::from(address), tcp)
            .await
            .map_err(FetchError::Handshake)?;

        let (_, session) = tls.get_ref();
        let leaf = session
            .peer_certificates()
            .and_then(|certs| certs.first())
            .map(|cert| cert.as_ref().to_vec());

        // `tls` is dropped here, closing the socket.
        leaf.ok_or(FetchError::NoCertificate)
    }
}

fn classify(address: IpAddr, err: FetchError) -> ProbeOutcome {
    match err {
        FetchError::Connect(e) | FetchError::Handshake(e)
            if ScanError::is_resource_exhaustion(&e) =>
        {
            ProbeOutcome::Failed(ScanError::ProbeFatal { address, source: e })
        }
        FetchError::Connect(e) => {
            trace!("{}: connect failed: {}", address, e);
            ProbeOutcome::Skipped(SkipReason::Unreachable)
        }
        FetchError::Handshake(e) => {
            trace!("{}: handshake failed: {}", address, e);
            ProbeOutcome::Skipped(SkipReason::HandshakeFailed)
        }
        FetchError::NoCertificate => ProbeOutcome::Skipped(SkipReason::NoCertificate),
    }
}

#[async_trait]
impl Prober for TlsProber {
    async fn probe(&self, address: IpAddr, keyword: &str, deadline: Instant) -> ProbeOutcome {
        let budget = deadline.min(deadline_after(self.probe_timeout));

        let der = match tokio::time::timeout_at(budget, self.fetch_leaf(address)).await {
            Err(_) => return ProbeOutcome::Skipped(SkipReason::TimedOut),
            Ok(Err(e)) => return classify(address, e),
            Ok(Ok(der)) => der,
        };

        let fields = match CertificateFields::from_der(&der) {
            Ok(fields) => fields,
            Err(e) => {
                trace!("{}: {}", address, e);
                return ProbeOutcome::Skipped(SkipReason::UnparseableCertificate);
            }
        };

        let Some(matched_name) = fields.find(keyword).map(str::to_string) else {
            return ProbeOutcome::NoMatch;
        };

        ProbeOutcome::Matched(CertMatch {
            address,
            port: self.port,
            matched_name,
            common_names: fields.common_names,
            alt_names: fields.alt_names,
            fingerprint: fields.fingerprint,
        })
    }
}

/// Accepts whatever chain the peer presents. Certificates are inspected,
/// never trusted.
#[derive(Debug)]
struct AcceptAnyCertificate {
    schemes: Vec<SignatureScheme>,
}

impl AcceptAnyCertificate {
    fn new(provider: &CryptoProvider) -> Self {
        Self {
            schemes: provider
                .signature_verification_algorithms
                .supported_schemes(),
        }
    }
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
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
    use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;

    const LOCALHOST: &str = "127.0.0.1";

    /// Serve a freshly minted self-signed certificate on an ephemeral port
    async fn serve_certificate(common_name: &str, alt_names: &[&str]) -> u16 {
        let mut params =
            CertificateParams::new(alt_names.iter().map(|s| s.to_string()).collect::<Vec<_>>())
                .unwrap();
        params.distinguished_name = DistinguishedName::new();
        params.distinguished_name.push(DnType::CommonName, common_name);
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();

        let server_config =
            rustls::ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
                .with_safe_default_protocol_versions()
                .unwrap()
                .with_no_client_auth()
                .with_single_cert(
                    vec![cert.der().clone()],
                    PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der())),
                )
                .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(server_config));

        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    let _ = acceptor.accept(stream).await;
                });
            }
        });

        port
    }

    fn localhost() -> IpAddr {
        LOCALHOST.parse().unwrap()
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_self_signed_certificate_matches() {
        let port = serve_certificate("shop.keyword-example.com", &["www.example.org"]).await;
        let prober = TlsProber::new(port, Duration::from_secs(2)).unwrap();

        match prober.probe(localhost(), "keyword", deadline()).await {
            ProbeOutcome::Matched(m) => {
                assert_eq!(m.address, localhost());
                assert_eq!(m.port, port);
                assert_eq!(m.matched_name, "shop.keyword-example.com");
                assert!(m.alt_names.contains(&"www.example.org".to_string()));
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_alt_name_match() {
        let port = serve_certificate("origin", &["a.example.org", "cdn.keyword.example"]).await;
        let prober = TlsProber::new(port, Duration::from_secs(2)).unwrap();

        match prober.probe(localhost(), "keyword", deadline()).await {
            ProbeOutcome::Matched(m) => assert_eq!(m.matched_name, "cdn.keyword.example"),
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_certificate_without_keyword() {
        let port = serve_certificate("origin.example.org", &["www.example.org"]).await;
        let prober = TlsProber::new(port, Duration::from_secs(2)).unwrap();

        let outcome = prober.probe(localhost(), "keyword", deadline()).await;
        assert!(matches!(outcome, ProbeOutcome::NoMatch), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_closed_port_is_skipped() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = TlsProber::new(port, Duration::from_secs(2)).unwrap();
        let outcome = prober.probe(localhost(), "keyword", deadline()).await;
        assert!(
            matches!(outcome, ProbeOutcome::Skipped(SkipReason::Unreachable)),
            "{:?}",
            outcome
        );
    }

    #[tokio::test]
    async fn test_non_tls_service_is_skipped() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(b"HTTP/1.0 400 Bad Request\r\n\r\n").await;
            }
        });

        let prober = TlsProber::new(port, Duration::from_secs(2)).unwrap();
        let outcome = prober.probe(localhost(), "keyword", deadline()).await;
        assert!(
            matches!(outcome, ProbeOutcome::Skipped(SkipReason::HandshakeFailed)),
            "{:?}",
            outcome
        );
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        // Kernel completes the TCP handshake; nobody ever answers the ClientHello
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = TlsProber::new(port, Duration::from_millis(200)).unwrap();
        let started = Instant::now();
        let outcome = prober.probe(localhost(), "keyword", deadline()).await;

        assert!(
            matches!(outcome, ProbeOutcome::Skipped(SkipReason::TimedOut)),
            "{:?}",
            outcome
        );
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(listener);
    }

    #[tokio::test]
    async fn test_scan_deadline_caps_probe_budget() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = TlsProber::new(port, Duration::from_secs(30)).unwrap();
        let started = Instant::now();
        let outcome = prober
            .probe(localhost(), "keyword", Instant::now() + Duration::from_millis(200))
            .await;

        assert!(matches!(outcome, ProbeOutcome::Skipped(SkipReason::TimedOut)));
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(listener);
    }

    #[tokio::test]
    async fn test_huge_probe_timeout_is_bounded_by_deadline() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = TlsProber::new(port, Duration::MAX).unwrap();
        let outcome = prober
            .probe(localhost(), "keyword", Instant::now() + Duration::from_millis(200))
            .await;

        assert!(matches!(outcome, ProbeOutcome::Skipped(SkipReason::TimedOut)));
        drop(listener);
    }
}
