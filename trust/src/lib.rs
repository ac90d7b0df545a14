// Copyright (c) 2023 The MobileCoin Foundation

#![doc = include_str!("../README.md")]
#![deny(missing_docs, missing_debug_implementations, unsafe_code)]

mod certificate_chain;
mod error;
pub mod keystore;
pub mod revocation;
mod security_mode;
pub mod tls;
mod trust_store;
mod validator;
pub mod x509;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod test_certs;

pub use certificate_chain::{CertificateChainVerifier, PeerRole, VerificationError};
pub use error::{Error, Result};
pub use revocation::{FetchSettings, RevocationFetcher, RevocationRecord};
pub use security_mode::{
    load_config, SecurityMode, ENVIRONMENT_PREFIX, LEGACY_HELLO_MESSAGES_KEY,
    LEGACY_RENEGOTIATION_KEY, RELAXED_TRUST_KEY,
};
pub use trust_store::{Baseline, DynamicTrustStore};
pub use validator::{ChainValidator, TrustMode};
