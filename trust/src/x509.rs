// Copyright (c) 2023 The MobileCoin Foundation

//! X.509 certificate and CRL handling

mod certs;
mod chain;
mod crl;
mod error;

pub use certs::Certificate;
pub(crate) use chain::same_anchor;
pub use chain::{default_verification_algorithms, TrustEngine};
pub use crl::{decode_crl, lists_certificate};
pub use error::Error;

/// Result for X.509 decoding
pub type Result<T> = core::result::Result<T, Error>;
