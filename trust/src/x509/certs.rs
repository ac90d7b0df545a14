// Copyright (c) 2023 The MobileCoin Foundation

//! Parsed X.509 certificates

use super::{Error, Result};
use const_oid::db::rfc5912::ID_CE_CRL_DISTRIBUTION_POINTS;
use const_oid::ObjectIdentifier;
use rustls_pki_types::CertificateDer;
use x509_cert::der::{Decode, Encode};
use x509_cert::ext::pkix::CrlDistributionPoints;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate as X509Certificate;

/// PEM label for certificates
const CERTIFICATE_PEM_LABEL: &str = "CERTIFICATE";

/// A decoded X.509 certificate.
///
/// The original DER bytes are retained alongside the decoded structure since
/// trust decisions and anchor matching operate on the encoded form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    der_bytes: Vec<u8>,
    certificate: X509Certificate,
}

impl Certificate {
    /// Decode a certificate from DER bytes.
    pub fn from_der(der_bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let der_bytes = der_bytes.into();
        let certificate = X509Certificate::from_der(&der_bytes)?;
        Ok(Self {
            der_bytes,
            certificate,
        })
    }

    /// Decode a single PEM encoded certificate.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self> {
        let (label, der_bytes) =
            x509_cert::der::pem::decode_vec(pem.as_ref()).map_err(x509_cert::der::Error::from)?;
        if label != CERTIFICATE_PEM_LABEL {
            return Err(Error::PemLabel(label.to_string()));
        }
        Self::from_der(der_bytes)
    }

    /// Decode every certificate in a PEM bundle, in order.
    pub fn load_pem_chain(pem: impl AsRef<[u8]>) -> Result<Vec<Self>> {
        X509Certificate::load_pem_chain(pem.as_ref())?
            .into_iter()
            .map(|certificate| {
                let der_bytes = certificate.to_der()?;
                Ok(Self {
                    der_bytes,
                    certificate,
                })
            })
            .collect()
    }

    /// The DER encoding of this certificate.
    pub fn der(&self) -> &[u8] {
        &self.der_bytes
    }

    /// Borrow this certificate in the form the trust engine consumes.
    pub fn as_certificate_der(&self) -> CertificateDer<'_> {
        CertificateDer::from(self.der_bytes.as_slice())
    }

    /// The decoded structure.
    pub fn x509(&self) -> &X509Certificate {
        &self.certificate
    }

    /// The subject name in RFC 4514 form.
    pub fn subject(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    /// The issuer name in RFC 4514 form.
    pub fn issuer(&self) -> String {
        self.certificate.tbs_certificate.issuer.to_string()
    }

    /// The serial number.
    pub fn serial_number(&self) -> &SerialNumber {
        &self.certificate.tbs_certificate.serial_number
    }

    /// The raw subject public key bits.
    pub fn public_key(&self) -> &[u8] {
        self.certificate
            .tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes()
    }

    /// Returns `true` when the subject and issuer names are identical.
    pub fn is_self_issued(&self) -> bool {
        self.certificate.tbs_certificate.subject == self.certificate.tbs_certificate.issuer
    }

    /// Look up the raw value of an extension by its dotted object identifier.
    ///
    /// The returned bytes are the contents of the extension's `extnValue`
    /// octet string.
    pub fn extension_value(&self, oid: &str) -> Result<Option<&[u8]>> {
        let oid =
            ObjectIdentifier::new(oid).map_err(|_| Error::ObjectIdentifier(oid.to_string()))?;
        Ok(self.extension_value_by_oid(&oid))
    }

    fn extension_value_by_oid(&self, oid: &ObjectIdentifier) -> Option<&[u8]> {
        self.certificate
            .tbs_certificate
            .extensions
            .as_ref()?
            .iter()
            .find(|extension| &extension.extn_id == oid)
            .map(|extension| extension.extn_value.as_bytes())
    }

    /// The decoded CRL distribution points extension, if present.
    pub fn crl_distribution_points(&self) -> Result<Option<CrlDistributionPoints>> {
        self.extension_value_by_oid(&ID_CE_CRL_DISTRIBUTION_POINTS)
            .map(|value| {
                CrlDistributionPoints::from_der(value)
                    .map_err(|e| Error::ExtensionDecoding(e.to_string()))
            })
            .transpose()
    }
}

/// Decode a DER encoded certificate into a [`Certificate`].
impl TryFrom<&[u8]> for Certificate {
    type Error = Error;

    fn try_from(der_bytes: &[u8]) -> ::core::result::Result<Self, Self::Error> {
        Self::from_der(der_bytes)
    }
}

impl TryFrom<&CertificateDer<'_>> for Certificate {
    type Error = Error;

    fn try_from(der: &CertificateDer<'_>) -> ::core::result::Result<Self, Self::Error> {
        Self::from_der(der.as_ref())
    }
}
