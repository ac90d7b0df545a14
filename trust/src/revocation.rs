// Copyright (c) 2023 The MobileCoin Foundation

//! Retrieval of the CRLs a certificate points at
//!
//! The CRL distribution points extension of a certificate names where its
//! issuer publishes revocation lists. [`RevocationFetcher`] retrieves every
//! `http` or `ftp` location, parses what comes back and collects the distinct
//! lists. Individual failures are logged and skipped; a fetch always yields a
//! [`RevocationRecord`], possibly an empty one.

mod transport;

pub use transport::{CrlTransport, FetchError, FtpTransport, HttpTransport, NetworkTransport};

use crate::security_mode::optional;
use crate::x509::{decode_crl, lists_certificate, Certificate};
use crate::Result;
use config::Config;
use std::io::{self, Read};
use std::time::Duration;
use tracing::{debug, warn};
use x509_cert::crl::CertificateList;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};

/// Configuration key for the connect timeout in seconds
pub const CONNECT_TIMEOUT_KEY: &str = "crl.connect_timeout_secs";
/// Configuration key for the total request timeout in seconds
pub const TIMEOUT_KEY: &str = "crl.timeout_secs";
/// Configuration key for the largest accepted CRL in bytes
pub const MAX_SIZE_KEY: &str = "crl.max_size_bytes";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// URI prefixes which are retrieved, anything else is ignored
const SUPPORTED_PREFIXES: [&str; 2] = ["http", "ftp"];

/// Limits applied to every CRL retrieval.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FetchSettings {
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time allowed for the whole request, including reading the body.
    pub timeout: Duration,
    /// The largest CRL, in bytes, which will be read.
    pub max_size: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl FetchSettings {
    /// Read the settings from `config`. Missing keys take their defaults.
    ///
    /// # Errors
    /// `Error::Config` if a key is present but is not a non-negative integer.
    pub fn from_config(config: &Config) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            connect_timeout: optional(config, CONNECT_TIMEOUT_KEY)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            timeout: optional(config, TIMEOUT_KEY)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_size: optional(config, MAX_SIZE_KEY)?.unwrap_or(defaults.max_size),
        })
    }
}

/// The distinct CRLs retrieved for one certificate.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RevocationRecord {
    crls: Vec<CertificateList>,
    bytes: u64,
}

impl RevocationRecord {
    /// The CRLs, in the order their distribution points were listed.
    pub fn crls(&self) -> &[CertificateList] {
        &self.crls
    }

    /// Bytes read for the CRLs in this record. Discarded duplicates and
    /// failed retrievals are not counted.
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes
    }

    /// The number of distinct CRLs.
    pub fn len(&self) -> usize {
        self.crls.len()
    }

    /// Returns `true` when no CRL was retrieved.
    pub fn is_empty(&self) -> bool {
        self.crls.is_empty()
    }

    /// Returns `true` if any CRL from the issuer of `certificate` lists it.
    ///
    /// CRL signatures are not checked.
    pub fn is_revoked(&self, certificate: &Certificate) -> bool {
        self.crls
            .iter()
            .any(|crl| lists_certificate(crl, certificate))
    }

    /// Take the CRLs out of the record.
    pub fn into_crls(self) -> Vec<CertificateList> {
        self.crls
    }

    /// Returns `false`, and leaves the count untouched, for a duplicate.
    fn insert(&mut self, crl: CertificateList, bytes: u64) -> bool {
        if self.crls.contains(&crl) {
            return false;
        }
        self.crls.push(crl);
        self.bytes += bytes;
        true
    }
}

/// The distribution point URIs of `certificate` which can be retrieved.
///
/// Only full names are considered, and of those only URIs beginning with
/// `http` or `ftp`. A missing or malformed extension yields no URIs.
pub fn distribution_point_uris(certificate: &Certificate) -> Vec<String> {
    let points = match certificate.crl_distribution_points() {
        Ok(Some(points)) => points,
        Ok(None) => return Vec::new(),
        Err(error) => {
            warn!(subject = %certificate.subject(), %error, "ignoring malformed CRL distribution points");
            return Vec::new();
        }
    };

    points
        .0
        .iter()
        .filter_map(|point| match &point.distribution_point {
            Some(DistributionPointName::FullName(names)) => Some(names),
            _ => None,
        })
        .flatten()
        .filter_map(|name| match name {
            GeneralName::UniformResourceIdentifier(uri) => Some(uri.as_str()),
            _ => None,
        })
        .filter(|uri| SUPPORTED_PREFIXES.iter().any(|prefix| uri.starts_with(prefix)))
        .map(str::to_string)
        .collect()
}

/// Counts the bytes read through it.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.count += read as u64;
        Ok(read)
    }
}

/// Retrieves the CRLs named by certificates.
///
/// Retrieval is sequential and blocking. It is not part of chain validation;
/// callers decide when revocation information is wanted.
#[derive(Debug)]
pub struct RevocationFetcher {
    transport: Box<dyn CrlTransport>,
    settings: FetchSettings,
}

impl RevocationFetcher {
    /// A fetcher using [`NetworkTransport`].
    ///
    /// # Errors
    /// `Error::HttpClient` if the HTTP client cannot be built.
    pub fn new(settings: FetchSettings) -> Result<Self> {
        let transport = NetworkTransport::new(&settings)?;
        Ok(Self::with_transport(transport, settings))
    }

    /// A fetcher retrieving through `transport`.
    pub fn with_transport(transport: impl CrlTransport + 'static, settings: FetchSettings) -> Self {
        Self {
            transport: Box::new(transport),
            settings,
        }
    }

    /// The limits applied to each retrieval.
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Retrieve every CRL named by `certificate`.
    ///
    /// A certificate without distribution points and a certificate whose
    /// distribution points all failed both produce an empty record; the
    /// difference is only visible in the logs.
    pub fn fetch(&self, certificate: &Certificate) -> RevocationRecord {
        let subject = certificate.subject();
        let uris = distribution_point_uris(certificate);
        let mut record = RevocationRecord::default();
        if uris.is_empty() {
            debug!(%subject, "no CRL distribution points");
            return record;
        }

        let mut failures = 0;
        for uri in &uris {
            match self.fetch_one(uri) {
                Ok((crl, bytes)) => {
                    if record.insert(crl, bytes) {
                        debug!(%uri, bytes, "retrieved CRL");
                    } else {
                        debug!(%uri, "discarding duplicate CRL");
                    }
                }
                Err(error) => {
                    failures += 1;
                    warn!(%uri, %subject, %error, "failed to retrieve CRL");
                }
            }
        }

        debug!(
            %subject,
            attempted = uris.len(),
            failures,
            collected = record.len(),
            bytes = record.bytes_transferred(),
            "CRL retrieval finished"
        );
        record
    }

    /// The stream is dropped before returning, whatever the outcome.
    fn fetch_one(&self, uri: &str) -> core::result::Result<(CertificateList, u64), FetchError> {
        let mut reader = CountingReader::new(self.transport.open(uri)?);
        let mut contents = Vec::new();
        (&mut reader)
            .take(self.settings.max_size.saturating_add(1))
            .read_to_end(&mut contents)?;
        if reader.count > self.settings.max_size {
            return Err(FetchError::TooLarge(self.settings.max_size));
        }
        let crl = decode_crl(&contents)?;
        Ok((crl, reader.count))
    }
}
