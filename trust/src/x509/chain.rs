// Copyright (c) 2023 The MobileCoin Foundation

//! Support for verifying certificate chains

use crate::{CertificateChainVerifier, PeerRole, VerificationError};
use rustls_pki_types::{CertificateDer, SignatureVerificationAlgorithm, TrustAnchor, UnixTime};
use tracing::debug;
use webpki::{EndEntityCert, KeyUsage};

/// The signature algorithms used when no explicit set is configured.
pub fn default_verification_algorithms() -> &'static [&'static dyn SignatureVerificationAlgorithm]
{
    webpki::ALL_VERIFICATION_ALGS
}

/// An immutable snapshot of trust anchors able to verify certificate chains.
///
/// A leaf certificate which is itself one of the anchors is trusted directly,
/// without further checks. Any other chain must build a path from the leaf,
/// through the presented intermediates, to one of the anchors. Expiry,
/// signatures and basic constraints are checked along that path.
#[derive(Clone, Debug)]
pub struct TrustEngine {
    anchors: Vec<TrustAnchor<'static>>,
    algorithms: &'static [&'static dyn SignatureVerificationAlgorithm],
}

impl TrustEngine {
    /// Create a new instance
    ///
    /// # Errors
    /// `Error::NoVerificationAlgorithms` if `algorithms` is empty, no chain
    /// could ever be verified.
    pub fn new(
        anchors: impl IntoIterator<Item = TrustAnchor<'static>>,
        algorithms: &'static [&'static dyn SignatureVerificationAlgorithm],
    ) -> crate::Result<Self> {
        if algorithms.is_empty() {
            return Err(crate::Error::NoVerificationAlgorithms);
        }
        Ok(Self {
            anchors: anchors.into_iter().collect(),
            algorithms,
        })
    }

    /// The anchors this engine trusts.
    pub fn anchors(&self) -> &[TrustAnchor<'static>] {
        &self.anchors
    }

    fn trusts_directly(&self, leaf: &CertificateDer<'_>) -> bool {
        let Ok(candidate) = webpki::anchor_from_trusted_cert(leaf) else {
            return false;
        };
        self.anchors
            .iter()
            .any(|anchor| same_anchor(anchor, &candidate))
    }
}

impl CertificateChainVerifier for TrustEngine {
    fn verify_certificate_chain(
        &self,
        certificate_chain: &[CertificateDer<'_>],
        role: PeerRole,
    ) -> Result<(), VerificationError> {
        let (leaf, intermediates) = certificate_chain
            .split_first()
            .ok_or(VerificationError::EmptyChain)?;

        if self.trusts_directly(leaf) {
            debug!("leaf certificate is a trust anchor");
            return Ok(());
        }

        let end_entity = EndEntityCert::try_from(leaf)?;
        let usage = match role {
            PeerRole::Client => KeyUsage::client_auth(),
            PeerRole::Server => KeyUsage::server_auth(),
        };
        end_entity
            .verify_for_usage(
                self.algorithms,
                &self.anchors,
                intermediates,
                UnixTime::now(),
                usage,
                None,
                None,
            )
            .map(|_| ())
            .map_err(|error| {
                debug!(%error, "certificate chain rejected");
                VerificationError::from(error)
            })
    }
}

/// Two anchors are the same when both the subject and the key match.
pub(crate) fn same_anchor(left: &TrustAnchor<'_>, right: &TrustAnchor<'_>) -> bool {
    left.subject.as_ref() == right.subject.as_ref()
        && left.subject_public_key_info.as_ref() == right.subject_public_key_info.as_ref()
}

// The context-free variants are what older 0.103 releases still return
#[allow(deprecated)]
impl From<webpki::Error> for VerificationError {
    fn from(error: webpki::Error) -> Self {
        match error {
            webpki::Error::CertExpired { .. } => VerificationError::CertificateExpired,
            webpki::Error::CertNotValidYet { .. } => VerificationError::CertificateNotYetValid,
            webpki::Error::UnknownIssuer { .. } => VerificationError::UnknownIssuer,
            webpki::Error::InvalidSignatureForPublicKey { .. } => {
                VerificationError::SignatureVerification
            }
            webpki::Error::UnsupportedSignatureAlgorithm
            | webpki::Error::UnsupportedSignatureAlgorithmContext(_)
            | webpki::Error::UnsupportedSignatureAlgorithmForPublicKey
            | webpki::Error::UnsupportedSignatureAlgorithmForPublicKeyContext(_) => {
                VerificationError::UnsupportedSignatureAlgorithm
            }
            webpki::Error::CaUsedAsEndEntity { .. }
            | webpki::Error::EndEntityUsedAsCa { .. }
            | webpki::Error::PathLenConstraintViolated { .. } => {
                VerificationError::BasicConstraints
            }
            webpki::Error::RequiredEkuNotFound | webpki::Error::RequiredEkuNotFoundContext(_) => {
                VerificationError::ExtendedKeyUsage
            }
            webpki::Error::BadDer { .. }
            | webpki::Error::BadDerTime { .. }
            | webpki::Error::TrailingData { .. }
            | webpki::Error::UnsupportedCertVersion { .. } => VerificationError::BadEncoding,
            _ => VerificationError::GeneralCertificateError,
        }
    }
}
