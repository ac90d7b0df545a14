// Copyright (c) 2023 The MobileCoin Foundation

//! A set of trust anchors which can grow while the process runs

use crate::x509::{default_verification_algorithms, same_anchor, Certificate, TrustEngine};
use crate::{CertificateChainVerifier, PeerRole, Result, VerificationError};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustls_pki_types::{CertificateDer, SignatureVerificationAlgorithm, TrustAnchor};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Number of random bytes in an anchor label
const LABEL_BYTES: usize = 16;

/// Where the initial trust anchors come from.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Baseline {
    /// The Mozilla root program as shipped by `webpki-roots`.
    #[default]
    WebPkiRoots,
    /// Every certificate of a PEM bundle on disk.
    PemBundle(PathBuf),
    /// No anchors at all.
    Empty,
}

impl Baseline {
    fn anchors(&self) -> Result<Vec<TrustAnchor<'static>>> {
        match self {
            Baseline::WebPkiRoots => Ok(webpki_roots::TLS_SERVER_ROOTS.to_vec()),
            Baseline::PemBundle(path) => {
                let pem = std::fs::read(path)?;
                Certificate::load_pem_chain(pem)?
                    .iter()
                    .map(|certificate| owned_anchor(&certificate.as_certificate_der()))
                    .collect()
            }
            Baseline::Empty => Ok(Vec::new()),
        }
    }
}

fn owned_anchor(certificate: &CertificateDer<'_>) -> Result<TrustAnchor<'static>> {
    Ok(webpki::anchor_from_trusted_cert(certificate)?.to_owned())
}

fn fresh_label() -> String {
    hex::encode(rand::random::<[u8; LABEL_BYTES]>())
}

/// The labelled anchors. Only ever touched with the writer lock held.
#[derive(Debug, Default)]
struct AnchorSet {
    anchors: BTreeMap<String, TrustAnchor<'static>>,
}

impl AnchorSet {
    fn insert(&mut self, anchor: TrustAnchor<'static>) -> String {
        loop {
            let label = fresh_label();
            if let Entry::Vacant(entry) = self.anchors.entry(label.clone()) {
                entry.insert(anchor);
                return label;
            }
        }
    }

    fn label_of(&self, anchor: &TrustAnchor<'_>) -> Option<&str> {
        self.anchors
            .iter()
            .find(|(_, existing)| same_anchor(existing, anchor))
            .map(|(label, _)| label.as_str())
    }

    fn engine(
        &self,
        algorithms: &'static [&'static dyn SignatureVerificationAlgorithm],
    ) -> Result<TrustEngine> {
        TrustEngine::new(self.anchors.values().cloned(), algorithms)
    }
}

/// An in memory trust store whose anchors can be added at runtime.
///
/// Verification always runs against an immutable [`TrustEngine`] snapshot.
/// [`DynamicTrustStore::add_anchor()`] inserts under a writer lock and then
/// swaps in a freshly built engine, so concurrent verifications either see
/// the old snapshot or the new one, never something in between. Adding an
/// anchor from within a verification callback is safe since verification
/// never takes the writer lock.
///
/// Anchors are never removed for the lifetime of the store.
#[derive(Debug)]
pub struct DynamicTrustStore {
    anchors: Mutex<AnchorSet>,
    engine: ArcSwap<TrustEngine>,
    algorithms: &'static [&'static dyn SignatureVerificationAlgorithm],
}

impl DynamicTrustStore {
    /// Create a store holding the anchors of `baseline`.
    ///
    /// # Errors
    /// * `Error::Io` or `Error::X509` if a PEM bundle cannot be read.
    /// * `Error::TrustAnchor` if a baseline certificate is not a usable anchor.
    pub fn initialize(baseline: &Baseline) -> Result<Self> {
        Self::with_algorithms(baseline, default_verification_algorithms())
    }

    /// Create a store which verifies signatures with `algorithms`.
    ///
    /// # Errors
    /// In addition to the errors of [`DynamicTrustStore::initialize()`],
    /// `Error::NoVerificationAlgorithms` when `algorithms` is empty.
    pub fn with_algorithms(
        baseline: &Baseline,
        algorithms: &'static [&'static dyn SignatureVerificationAlgorithm],
    ) -> Result<Self> {
        let mut anchors = AnchorSet::default();
        for anchor in baseline.anchors()? {
            anchors.insert(anchor);
        }
        let engine = anchors.engine(algorithms)?;
        info!(anchors = anchors.anchors.len(), "trust store initialized");
        Ok(Self {
            anchors: Mutex::new(anchors),
            engine: ArcSwap::from_pointee(engine),
            algorithms,
        })
    }

    /// The current trust engine.
    ///
    /// The returned snapshot does not observe anchors added afterwards.
    pub fn engine(&self) -> Arc<TrustEngine> {
        self.engine.load_full()
    }

    /// Trust `certificate` from now on and return the label it is stored
    /// under.
    ///
    /// If an identical anchor is already present its existing label is
    /// returned and nothing is rebuilt.
    ///
    /// # Errors
    /// `Error::TrustAnchor` when the certificate cannot be decoded into an
    /// anchor.
    pub fn add_anchor(&self, certificate: &CertificateDer<'_>) -> Result<String> {
        let anchor = owned_anchor(certificate)?;

        let mut anchors = self.anchors.lock();
        if let Some(label) = anchors.label_of(&anchor) {
            debug!(%label, "trust anchor already present");
            return Ok(label.to_string());
        }

        let label = anchors.insert(anchor);
        let engine = match anchors.engine(self.algorithms) {
            Ok(engine) => engine,
            Err(error) => {
                anchors.anchors.remove(&label);
                return Err(error);
            }
        };
        self.engine.store(Arc::new(engine));
        info!(%label, anchors = anchors.anchors.len(), "trust anchor added");
        Ok(label)
    }

    /// The number of anchors.
    pub fn anchor_count(&self) -> usize {
        self.anchors.lock().anchors.len()
    }

    /// The labels of all anchors.
    pub fn labels(&self) -> Vec<String> {
        self.anchors.lock().anchors.keys().cloned().collect()
    }

    /// Returns `true` when `certificate` is one of the anchors.
    pub fn contains(&self, certificate: &CertificateDer<'_>) -> bool {
        let Ok(anchor) = webpki::anchor_from_trusted_cert(certificate) else {
            return false;
        };
        self.anchors.lock().label_of(&anchor).is_some()
    }
}

impl CertificateChainVerifier for DynamicTrustStore {
    fn verify_certificate_chain(
        &self,
        certificate_chain: &[CertificateDer<'_>],
        role: PeerRole,
    ) -> core::result::Result<(), VerificationError> {
        self.engine
            .load()
            .verify_certificate_chain(certificate_chain, role)
    }
}
