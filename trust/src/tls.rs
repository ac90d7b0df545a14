// Copyright (c) 2023 The MobileCoin Foundation

//! Using a [`ChainValidator`] for the trust decisions of TLS handshakes
//!
//! [`TrustCallback`] implements both of the `rustls` certificate verifier
//! traits. Only the certificate chain is judged; the server name is not
//! compared against the certificate.

use crate::{ChainValidator, Result, SecurityMode, VerificationError};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{
    ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider,
    WebPkiSupportedAlgorithms,
};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, DistinguishedName, OtherError,
    SignatureScheme,
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use std::sync::Arc;
use tracing::warn;

/// Hands peer certificate chains to a [`ChainValidator`].
#[derive(Debug)]
pub struct TrustCallback {
    validator: Arc<ChainValidator>,
    algorithms: WebPkiSupportedAlgorithms,
}

impl TrustCallback {
    /// Create a callback verifying handshake signatures with the `ring`
    /// provider.
    pub fn new(validator: Arc<ChainValidator>) -> Self {
        Self::with_provider(validator, &ring::default_provider())
    }

    /// Create a callback verifying handshake signatures with the algorithms
    /// of `provider`.
    pub fn with_provider(validator: Arc<ChainValidator>, provider: &CryptoProvider) -> Self {
        Self {
            validator,
            algorithms: provider.signature_verification_algorithms,
        }
    }
}

fn presented_chain<'a>(
    end_entity: &'a CertificateDer<'a>,
    intermediates: &'a [CertificateDer<'a>],
) -> Vec<CertificateDer<'a>> {
    std::iter::once(end_entity)
        .chain(intermediates)
        .map(|certificate| CertificateDer::from(certificate.as_ref()))
        .collect()
}

fn to_rustls_error(error: VerificationError) -> rustls::Error {
    let error = match error {
        VerificationError::CertificateExpired => CertificateError::Expired,
        VerificationError::CertificateNotYetValid => CertificateError::NotValidYet,
        VerificationError::UnknownIssuer => CertificateError::UnknownIssuer,
        VerificationError::SignatureVerification => CertificateError::BadSignature,
        VerificationError::EmptyChain | VerificationError::BadEncoding => {
            CertificateError::BadEncoding
        }
        other => CertificateError::Other(OtherError(Arc::new(other))),
    };
    rustls::Error::InvalidCertificate(error)
}

impl ServerCertVerifier for TrustCallback {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> core::result::Result<ServerCertVerified, rustls::Error> {
        self.validator
            .validate_server(&presented_chain(end_entity, intermediates))
            .map(|()| ServerCertVerified::assertion())
            .map_err(to_rustls_error)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> core::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> core::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

impl ClientCertVerifier for TrustCallback {
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> core::result::Result<ClientCertVerified, rustls::Error> {
        self.validator
            .validate_client(&presented_chain(end_entity, intermediates))
            .map(|()| ClientCertVerified::assertion())
            .map_err(to_rustls_error)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> core::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> core::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

/// Report the legacy handshake flags of `mode`.
///
/// `rustls` never renegotiates and always frames hello messages with the
/// secure renegotiation extension, so neither flag changes the handshake.
/// Returns whether either flag was set.
pub fn report_legacy_flags(mode: &SecurityMode) -> bool {
    if mode.legacy_renegotiation() {
        warn!("legacy renegotiation requested, renegotiation is not supported and stays disabled");
    }
    if mode.legacy_hello_messages() {
        warn!("legacy hello messages requested, hello messages keep their secure framing");
    }
    mode.legacy_renegotiation() || mode.legacy_hello_messages()
}

/// A client configuration whose server trust decisions are made by
/// `validator`.
///
/// The safe default protocol versions, TLS 1.3 and TLS 1.2, are offered.
/// The installed [`SecurityMode`] is read for its legacy handshake flags.
///
/// # Errors
/// - `Error::SecurityModeNotInstalled` if no mode has been installed.
/// - `Error::Tls` if the provider does not support the protocol versions.
pub fn client_config(validator: Arc<ChainValidator>) -> Result<ClientConfig> {
    report_legacy_flags(SecurityMode::current()?);
    let provider = Arc::new(ring::default_provider());
    let callback = Arc::new(TrustCallback::with_provider(validator, &provider));
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(callback)
        .with_no_client_auth();
    Ok(config)
}

/// A verifier for client certificates backed by `validator`, for use with
/// `rustls::ServerConfig::builder().with_client_cert_verifier()`.
pub fn client_cert_verifier(validator: Arc<ChainValidator>) -> Arc<dyn ClientCertVerifier> {
    Arc::new(TrustCallback::new(validator))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Baseline, DynamicTrustStore, TrustMode};
    use yare::parameterized;

    #[parameterized(
        strict = { SecurityMode::strict(), false },
        relaxed = { SecurityMode::relaxed(), true },
        hello_only = { SecurityMode::new(false, false, true), true },
        renegotiation_only = { SecurityMode::new(false, true, false), true },
        trust_only = { SecurityMode::new(true, false, false), false },
    )]
    fn legacy_flags_reported(mode: SecurityMode, expected: bool) {
        assert_eq!(report_legacy_flags(&mode), expected);
    }

    #[test]
    fn verification_errors_map_to_certificate_errors() {
        assert_eq!(
            to_rustls_error(VerificationError::UnknownIssuer),
            rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer)
        );
        assert_eq!(
            to_rustls_error(VerificationError::CertificateExpired),
            rustls::Error::InvalidCertificate(CertificateError::Expired)
        );
        assert!(matches!(
            to_rustls_error(VerificationError::BasicConstraints),
            rustls::Error::InvalidCertificate(CertificateError::Other(_))
        ));
    }

    #[test]
    fn client_config_builds_for_installed_mode() {
        SecurityMode::strict()
            .install()
            .expect("Failed installing mode");
        let store = DynamicTrustStore::initialize(&Baseline::Empty).expect("Failed creating store");
        let validator = Arc::new(ChainValidator::new(Arc::new(store), TrustMode::Strict));

        assert!(client_config(validator).is_ok());
    }
}
