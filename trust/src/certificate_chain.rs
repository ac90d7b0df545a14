// Copyright (c) 2023 The MobileCoin Foundation

//! Trait and Error for verifying certificate chains

use rustls_pki_types::CertificateDer;

/// Error verifying a certificate chain
#[derive(displaydoc::Display, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// No certificates were presented
    EmptyChain,
    /// X509 certificate not yet valid
    CertificateNotYetValid,
    /// X509 certificate has expired
    CertificateExpired,
    /// The chain does not terminate at a trusted anchor
    UnknownIssuer,
    /// Error verifying the signature
    SignatureVerification,
    /// The signature algorithm is not supported
    UnsupportedSignatureAlgorithm,
    /// A certificate in the chain violates its basic constraints
    BasicConstraints,
    /// The leaf certificate is not valid for the requested purpose
    ExtendedKeyUsage,
    /// A certificate in the chain is malformed
    BadEncoding,
    /// General error trying to verify a certificate chain
    GeneralCertificateError,
}

impl std::error::Error for VerificationError {}

/// The side of a connection whose certificate chain is being verified.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeerRole {
    /// A client authenticating to this process.
    Client,
    /// A server this process connected to.
    Server,
}

/// A trait whose implementation will verify certificate chains against a set
/// of trust anchors.
pub trait CertificateChainVerifier {
    /// Verify a certificate chain.
    ///
    /// # Arguments
    /// * `certificate_chain` - The certificate chain to verify, leaf first.
    /// * `role` - Whether the chain was presented by a client or a server.
    fn verify_certificate_chain(
        &self,
        certificate_chain: &[CertificateDer<'_>],
        role: PeerRole,
    ) -> Result<(), VerificationError>;
}
