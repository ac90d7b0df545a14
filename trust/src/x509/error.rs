/// Error type for decoding certificates and CRLs.
#[derive(Debug, displaydoc::Display, PartialEq, Eq)]
pub enum Error {
    /// An error occurred decoding the certificate: {0}
    CertificateDecoding(x509_cert::der::Error),
    /// An error occurred decoding the CRL: {0}
    CrlDecoding(x509_cert::der::Error),
    /// Unexpected PEM label {0}
    PemLabel(String),
    /// The object identifier {0} is not valid
    ObjectIdentifier(String),
    /// An error occurred decoding the extension {0}
    ExtensionDecoding(String),
}

impl From<x509_cert::der::Error> for Error {
    fn from(src: x509_cert::der::Error) -> Self {
        Error::CertificateDecoding(src)
    }
}

impl std::error::Error for Error {}
