// src/probe/matcher.rs
use anyhow::Result;
use sha2::{Digest, Sha256};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::*;

/// The identity fields of a leaf certificate that keywords are matched against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFields {
    pub common_names: Vec<String>,
    pub alt_names: Vec<String>,
    pub fingerprint: String,
}

impl CertificateFields {
    /// Parse a DER-encoded certificate and extract subject CNs and SAN entries
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let fingerprint = {
            let mut hasher = Sha256::new();
            hasher.update(der);
            hex::encode(hasher.finalize())
        };

        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| anyhow::anyhow!("Failed to parse X.509 certificate: {:?}", e))?;

        let common_names = cert
            .subject()
            .iter_common_name()
            .filter_map(|cn| cn.as_str().ok())
            .map(str::to_string)
            .collect();

        let mut alt_names = Vec::new();
        for ext in cert.extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for general_name in &san.general_names {
                    if let Some(name) = general_name_text(general_name) {
                        alt_names.push(name);
                    }
                }
            }
        }

        Ok(Self {
            common_names,
            alt_names,
            fingerprint,
        })
    }

    /// First CN or SAN value containing `keyword` (case-sensitive substring).
    pub fn find(&self, keyword: &str) -> Option<&str> {
        self.common_names
            .iter()
            .chain(self.alt_names.iter())
            .map(String::as_str)
            .find(|name| name.contains(keyword))
    }
}

fn general_name_text(name: &GeneralName) -> Option<String> {
    match name {
        GeneralName::DNSName(s) | GeneralName::RFC822Name(s) | GeneralName::URI(s) => {
            Some(s.to_string())
        }
        GeneralName::IPAddress(bytes) => ip_from_bytes(bytes).map(|ip| ip.to_string()),
        GeneralName::DirectoryName(dn) => Some(dn.to_string()),
        _ => None,
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}
