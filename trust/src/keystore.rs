// Copyright (c) 2023 The MobileCoin Foundation

//! Key stores holding signing certificates and their private keys

use crate::x509::Certificate;
use crate::{Error, Result};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use pkcs8::{DecodePrivateKey, EncryptedPrivateKeyInfo};
use std::path::PathBuf;
use tracing::debug;

/// The key store type handled by [`PemKeyStore`]
pub const PEM_KEY_STORE_TYPE: &str = "PEM";

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Which key store to open and which entry to use.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SigningOptions {
    /// Location of the key store.
    pub keystore_path: PathBuf,
    /// The key store type, one of [`KeyStoreProvider::keystore_types()`].
    pub keystore_type: String,
    /// Password protecting the private key.
    pub password: Option<String>,
    /// The entry to use, the first one when `None`.
    pub alias: Option<String>,
}

/// A certificate, its chain and the matching private key.
#[derive(Debug)]
pub struct SigningMaterial {
    /// The alias of the entry.
    pub alias: String,
    /// The signing certificate.
    pub certificate: Certificate,
    /// Other certificates stored alongside, in file order.
    pub chain: Vec<Certificate>,
    /// The private key of `certificate`.
    pub signing_key: SigningKey,
}

/// Enumerates key stores for the signing workflow.
pub trait KeyStoreProvider {
    /// The key store types this provider opens.
    fn keystore_types(&self) -> Vec<String>;

    /// The aliases of the entries in the key store.
    fn aliases(&self, options: &SigningOptions) -> Result<Vec<String>>;

    /// The entry selected by `options`.
    fn signing_material(&self, options: &SigningOptions) -> Result<SigningMaterial>;
}

/// A PEM file holding certificates and one PKCS#8 P-256 private key.
///
/// The alias of a certificate is its subject name. The private key may be
/// plain (`PRIVATE KEY`) or password protected (`ENCRYPTED PRIVATE KEY`).
#[derive(Clone, Copy, Debug, Default)]
pub struct PemKeyStore;

struct PemContents {
    certificates: Vec<Certificate>,
    private_key: Option<PrivateKey>,
}

enum PrivateKey {
    Plain(Vec<u8>),
    Encrypted(Vec<u8>),
}

impl PrivateKey {
    fn decrypt(self, password: Option<&str>) -> Result<SecretKey> {
        match self {
            PrivateKey::Plain(der) => Ok(SecretKey::from_pkcs8_der(&der)?),
            PrivateKey::Encrypted(der) => {
                let password = password.ok_or(Error::PasswordRequired)?;
                let document = EncryptedPrivateKeyInfo::try_from(der.as_slice())
                    .map_err(pkcs8::Error::from)?
                    .decrypt(password)?;
                Ok(SecretKey::from_pkcs8_der(document.as_bytes())?)
            }
        }
    }
}

impl PemKeyStore {
    fn read(&self, options: &SigningOptions) -> Result<PemContents> {
        if !options
            .keystore_type
            .eq_ignore_ascii_case(PEM_KEY_STORE_TYPE)
        {
            return Err(Error::UnsupportedKeyStoreType(options.keystore_type.clone()));
        }

        let data = std::fs::read(&options.keystore_path)?;
        let mut contents = PemContents {
            certificates: Vec::new(),
            private_key: None,
        };
        for block in ::pem::parse_many(&data)? {
            match block.tag() {
                CERTIFICATE_LABEL => contents
                    .certificates
                    .push(Certificate::from_der(block.into_contents())?),
                PRIVATE_KEY_LABEL => {
                    contents.private_key = Some(PrivateKey::Plain(block.into_contents()))
                }
                ENCRYPTED_PRIVATE_KEY_LABEL => {
                    contents.private_key = Some(PrivateKey::Encrypted(block.into_contents()))
                }
                other => debug!(label = other, "skipping PEM block"),
            }
        }
        Ok(contents)
    }
}

impl KeyStoreProvider for PemKeyStore {
    fn keystore_types(&self) -> Vec<String> {
        vec![PEM_KEY_STORE_TYPE.to_string()]
    }

    fn aliases(&self, options: &SigningOptions) -> Result<Vec<String>> {
        Ok(self
            .read(options)?
            .certificates
            .iter()
            .map(Certificate::subject)
            .collect())
    }

    fn signing_material(&self, options: &SigningOptions) -> Result<SigningMaterial> {
        let PemContents {
            mut certificates,
            private_key,
        } = self.read(options)?;

        let index = match &options.alias {
            Some(alias) => certificates
                .iter()
                .position(|certificate| &certificate.subject() == alias)
                .ok_or_else(|| Error::UnknownAlias(alias.clone()))?,
            None if certificates.is_empty() => {
                return Err(Error::UnknownAlias(String::new()));
            }
            None => 0,
        };
        let certificate = certificates.remove(index);
        let alias = certificate.subject();

        let secret_key = private_key
            .ok_or(Error::MissingPrivateKey)?
            .decrypt(options.password.as_deref())?;
        let public_key = secret_key.public_key().to_encoded_point(false);
        if public_key.as_bytes() != certificate.public_key() {
            return Err(Error::KeyMismatch(alias));
        }

        Ok(SigningMaterial {
            alias,
            certificate,
            chain: certificates,
            signing_key: SigningKey::from(secret_key),
        })
    }
}
