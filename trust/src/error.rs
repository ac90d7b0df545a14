// Copyright (c) 2023 The MobileCoin Foundation

//! Errors that can occur while setting up trust evaluation

/// Result for trust setup and configuration
pub type Result<T> = core::result::Result<T, Error>;

/// Error constructing or configuring the trust components
///
/// These are fatal to initialization. Failures to verify a particular chain
/// are reported separately as [`crate::VerificationError`].
#[derive(displaydoc::Display, Debug)]
pub enum Error {
    /// No signature verification algorithms are available to build a trust engine
    NoVerificationAlgorithms,
    /// Certificate cannot be used as a trust anchor: {0}
    TrustAnchor(webpki::Error),
    /// Error decoding X.509 data: {0}
    X509(crate::x509::Error),
    /// I/O error: {0}
    Io(std::io::Error),
    /// Error reading configuration: {0}
    Config(config::ConfigError),
    /// A different security mode has already been installed for this process
    SecurityModeAlreadyInstalled,
    /// No security mode has been installed for this process
    SecurityModeNotInstalled,
    /// Error configuring TLS: {0}
    Tls(rustls::Error),
    /// Error building the HTTP client: {0}
    HttpClient(reqwest::Error),
    /// The key store type {0} is not supported
    UnsupportedKeyStoreType(String),
    /// No certificate with alias {0}
    UnknownAlias(String),
    /// The key store does not contain a private key
    MissingPrivateKey,
    /// A password is required to decrypt the private key
    PasswordRequired,
    /// Error decoding the private key: {0}
    PrivateKey(pkcs8::Error),
    /// Malformed PEM in the key store: {0}
    Pem(pem::PemError),
    /// The private key does not match the certificate for {0}
    KeyMismatch(String),
}

impl std::error::Error for Error {}

impl From<webpki::Error> for Error {
    fn from(e: webpki::Error) -> Self {
        Error::TrustAnchor(e)
    }
}

impl From<crate::x509::Error> for Error {
    fn from(e: crate::x509::Error) -> Self {
        Error::X509(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Error::Tls(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::HttpClient(e)
    }
}

impl From<pkcs8::Error> for Error {
    fn from(e: pkcs8::Error) -> Self {
        Error::PrivateKey(e)
    }
}

impl From<pem::PemError> for Error {
    fn from(e: pem::PemError) -> Self {
        Error::Pem(e)
    }
}
