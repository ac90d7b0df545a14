// Copyright (c) 2023 The MobileCoin Foundation

//! Certificate revocation list decoding and lookups

use super::{Certificate, Error, Result};
use x509_cert::crl::CertificateList;
use x509_cert::der::Decode;

/// PEM label for certificate revocation lists
const CRL_PEM_LABEL: &str = "X509 CRL";

/// Decode a CRL that was encoded as either DER or PEM.
pub fn decode_crl(bytes: &[u8]) -> Result<CertificateList> {
    let pem = trim_leading_whitespace(bytes);
    if pem.starts_with(b"-----BEGIN") {
        let (label, der_bytes) =
            x509_cert::der::pem::decode_vec(pem).map_err(|e| Error::CrlDecoding(e.into()))?;
        if label != CRL_PEM_LABEL {
            return Err(Error::PemLabel(label.to_string()));
        }
        return CertificateList::from_der(&der_bytes).map_err(Error::CrlDecoding);
    }
    CertificateList::from_der(bytes).map_err(Error::CrlDecoding)
}

fn trim_leading_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Returns `true` if `crl` was issued by the issuer of `certificate` and lists
/// the certificate's serial number.
pub fn lists_certificate(crl: &CertificateList, certificate: &Certificate) -> bool {
    let tbs = &crl.tbs_cert_list;
    if tbs.issuer != certificate.x509().tbs_certificate.issuer {
        return false;
    }
    tbs.revoked_certificates
        .iter()
        .flatten()
        .any(|revoked| &revoked.serial_number == certificate.serial_number())
}
