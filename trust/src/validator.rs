// Copyright (c) 2023 The MobileCoin Foundation

//! Chain validation on top of a [`DynamicTrustStore`]

use crate::x509::Certificate;
use crate::{
    Baseline, CertificateChainVerifier, DynamicTrustStore, PeerRole, Result, SecurityMode,
    VerificationError,
};
use rustls_pki_types::CertificateDer;
use std::sync::Arc;
use tracing::{info, warn};

/// How server certificate chains are judged.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TrustMode {
    /// Chains must verify against the trust store.
    #[default]
    Strict,
    /// A server chain that fails verification has its leaf added to the
    /// trust store, after which it is verified once more.
    Relaxed,
}

/// Verifies certificate chains presented by peers.
///
/// Client chains are always verified strictly. Server chains are verified
/// according to the [`TrustMode`].
///
/// # Relaxed mode
///
/// Relaxed mode is trust on first use with no memory of what was trusted
/// before: *any* server leaf which is presented once becomes a trust anchor
/// for the remainder of the process, and so does every chain it issues.
/// Each such insertion is logged at `warn` level.
#[derive(Debug)]
pub struct ChainValidator {
    store: Arc<DynamicTrustStore>,
    mode: TrustMode,
}

impl ChainValidator {
    /// Create a validator on top of `store`.
    pub fn new(store: Arc<DynamicTrustStore>, mode: TrustMode) -> Self {
        if mode == TrustMode::Relaxed {
            warn!("relaxed trust enabled, untrusted server certificates will be trusted on first use");
        }
        Self { store, mode }
    }

    /// Build the trust store from `baseline` and a validator in the trust
    /// mode selected by the installed [`SecurityMode`].
    ///
    /// # Errors
    /// - `Error::SecurityModeNotInstalled` if no mode has been installed.
    /// - Any error from [`DynamicTrustStore::initialize()`].
    pub fn initialize(baseline: &Baseline) -> Result<Self> {
        let mode = SecurityMode::current()?.trust_mode();
        let store = Arc::new(DynamicTrustStore::initialize(baseline)?);
        info!(?mode, "chain validator initialized");
        Ok(Self::new(store, mode))
    }

    /// The trust mode, fixed at construction.
    pub fn mode(&self) -> TrustMode {
        self.mode
    }

    /// The trust store chains are verified against.
    pub fn store(&self) -> &Arc<DynamicTrustStore> {
        &self.store
    }

    /// Verify a chain presented by a client, leaf first.
    pub fn validate_client(
        &self,
        certificate_chain: &[CertificateDer<'_>],
    ) -> core::result::Result<(), VerificationError> {
        self.store
            .verify_certificate_chain(certificate_chain, PeerRole::Client)
    }

    /// Verify a chain presented by a server, leaf first.
    ///
    /// In [`TrustMode::Relaxed`] a failed verification adds the leaf to the
    /// trust store and verifies exactly once more. The result of the second
    /// attempt is returned.
    pub fn validate_server(
        &self,
        certificate_chain: &[CertificateDer<'_>],
    ) -> core::result::Result<(), VerificationError> {
        let error = match (
            self.store
                .verify_certificate_chain(certificate_chain, PeerRole::Server),
            self.mode,
        ) {
            (Ok(()), _) => return Ok(()),
            (Err(error), TrustMode::Strict) => return Err(error),
            (Err(error), TrustMode::Relaxed) => error,
        };

        let Some(leaf) = certificate_chain.first() else {
            return Err(error);
        };
        let subject = Certificate::try_from(leaf)
            .map(|certificate| certificate.subject())
            .unwrap_or_default();

        match self.store.add_anchor(leaf) {
            Ok(label) => warn!(
                %subject,
                %label,
                %error,
                "relaxed trust: trusting untrusted server certificate for the rest of the process"
            ),
            Err(add_error) => {
                warn!(%subject, %error, %add_error, "relaxed trust: server certificate cannot be trusted");
                return Err(error);
            }
        }

        self.store
            .verify_certificate_chain(certificate_chain, PeerRole::Server)
    }
}

impl CertificateChainVerifier for ChainValidator {
    fn verify_certificate_chain(
        &self,
        certificate_chain: &[CertificateDer<'_>],
        role: PeerRole,
    ) -> core::result::Result<(), VerificationError> {
        match role {
            PeerRole::Client => self.validate_client(certificate_chain),
            PeerRole::Server => self.validate_server(certificate_chain),
        }
    }
}
