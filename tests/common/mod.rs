// Shared helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use cert_sweep::ScanError;
use cert_sweep::probe::Prober;
use cert_sweep::types::{CertMatch, ProbeOutcome, SkipReason};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn cert_match(address: IpAddr, name: &str) -> CertMatch {
    CertMatch {
        address,
        port: 443,
        matched_name: name.to_string(),
        common_names: vec![name.to_string()],
        alt_names: vec![],
        fingerprint: String::new(),
    }
}

/// Answers from a fixed table of certificate names; unknown addresses are unreachable
#[derive(Default)]
pub struct TableProber {
    names: HashMap<IpAddr, String>,
    fatal: HashSet<IpAddr>,
    probed: Mutex<Vec<IpAddr>>,
}

impl TableProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_certificate(mut self, address: &str, name: &str) -> Self {
        self.names.insert(ip(address), name.to_string());
        self
    }

    /// Probing this address reports a fatal local error
    pub fn with_fatal(mut self, address: &str) -> Self {
        self.fatal.insert(ip(address));
        self
    }

    pub fn probed(&self) -> Vec<IpAddr> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for TableProber {
    async fn probe(&self, address: IpAddr, keyword: &str, _deadline: Instant) -> ProbeOutcome {
        self.probed.lock().unwrap().push(address);

        if self.fatal.contains(&address) {
            return ProbeOutcome::Failed(ScanError::ProbeFatal {
                address,
                source: io::Error::from_raw_os_error(24),
            });
        }

        match self.names.get(&address) {
            Some(name) if name.contains(keyword) => {
                ProbeOutcome::Matched(cert_match(address, name))
            }
            Some(_) => ProbeOutcome::NoMatch,
            None => ProbeOutcome::Skipped(SkipReason::Unreachable),
        }
    }
}

/// Never returns: models hosts that swallow packets and ignore the deadline
pub struct HangingProber;

#[async_trait]
impl Prober for HangingProber {
    async fn probe(&self, _address: IpAddr, _keyword: &str, _deadline: Instant) -> ProbeOutcome {
        std::future::pending::<ProbeOutcome>().await
    }
}

/// Serve a self-signed certificate on 127.0.0.1, returning the port
pub async fn serve_certificate(common_name: &str, alt_names: &[&str]) -> u16 {
    let mut params =
        CertificateParams::new(alt_names.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .unwrap();
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, common_name);
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();

    let server_config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(
            vec![cert.der().clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der())),
        )
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(server_config));

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
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
