// Copyright (c) 2023 The MobileCoin Foundation

//! Certificates, keys and CRLs generated at test time.
#![allow(dead_code)]

use const_oid::ObjectIdentifier;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{DerSignature, SigningKey};
use p256::pkcs8::EncodePrivateKey;
use rand::rngs::OsRng;
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};
use x509_cert::der::asn1::{BitString, Ia5String, UtcTime};
use x509_cert::der::pem::LineEnding;
use x509_cert::der::Encode;
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{CrlDistributionPoints, ExtendedKeyUsage};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};
use x509_cert::Version;

const ONE_HOUR: Duration = Duration::from_secs(60 * 60);

/// Send log output to the test harness, filtered by `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn name(subject: &str) -> Name {
    Name::from_str(subject).expect("Invalid name")
}

fn serial() -> SerialNumber {
    // Leading 0x01 keeps the integer positive and minimally encoded
    let mut bytes = [1u8; 9];
    bytes[1..].copy_from_slice(&rand::random::<[u8; 8]>());
    SerialNumber::new(&bytes).expect("Invalid serial number")
}

fn utc(time: SystemTime) -> Time {
    Time::UtcTime(UtcTime::from_system_time(time).expect("Invalid time"))
}

fn valid_for_an_hour() -> Validity {
    Validity::from_now(ONE_HOUR).expect("Invalid validity")
}

fn expired_an_hour_ago() -> Validity {
    let now = SystemTime::now();
    Validity {
        not_before: utc(now - ONE_HOUR - ONE_HOUR),
        not_after: utc(now - ONE_HOUR),
    }
}

fn spki(key: &SigningKey) -> SubjectPublicKeyInfoOwned {
    SubjectPublicKeyInfoOwned::from_key(*key.verifying_key()).expect("Failed encoding key")
}

fn ecdsa_with_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
        parameters: None,
    }
}

fn builder<'k>(
    profile: Profile,
    subject: &str,
    subject_key: &SigningKey,
    issuer_key: &'k SigningKey,
    validity: Validity,
) -> CertificateBuilder<'k, SigningKey> {
    CertificateBuilder::new(
        profile,
        serial(),
        validity,
        name(subject),
        spki(subject_key),
        issuer_key,
    )
    .expect("Failed creating certificate builder")
}

fn sign(builder: CertificateBuilder<'_, SigningKey>) -> Vec<u8> {
    builder
        .build::<DerSignature>()
        .expect("Failed signing certificate")
        .to_der()
        .expect("Failed encoding certificate")
}

fn build(
    profile: Profile,
    subject: &str,
    subject_key: &SigningKey,
    issuer_key: &SigningKey,
    validity: Validity,
    distribution_points: Option<CrlDistributionPoints>,
) -> Vec<u8> {
    let mut builder = builder(profile, subject, subject_key, issuer_key, validity);
    if let Some(points) = distribution_points {
        builder
            .add_extension(&points)
            .expect("Failed adding distribution points");
    }
    sign(builder)
}

/// A distribution point naming a single URI.
pub fn uri_point(uri: &str) -> DistributionPoint {
    DistributionPoint {
        distribution_point: Some(DistributionPointName::FullName(vec![
            GeneralName::UniformResourceIdentifier(Ia5String::new(uri).expect("Invalid URI")),
        ])),
        reasons: None,
        crl_issuer: None,
    }
}

/// A distribution point naming a directory instead of a URI.
pub fn directory_point(subject: &str) -> DistributionPoint {
    DistributionPoint {
        distribution_point: Some(DistributionPointName::FullName(vec![
            GeneralName::DirectoryName(name(subject)),
        ])),
        reasons: None,
        crl_issuer: None,
    }
}

/// A distribution point which only names the CRL issuer.
pub fn issuer_only_point(uri: &str) -> DistributionPoint {
    DistributionPoint {
        distribution_point: None,
        reasons: None,
        crl_issuer: Some(vec![GeneralName::UniformResourceIdentifier(
            Ia5String::new(uri).expect("Invalid URI"),
        )]),
    }
}

/// A self-signed CA style certificate.
pub fn self_signed(subject: &str) -> Vec<u8> {
    self_signed_with_key(subject).0
}

/// A self-signed certificate and its PKCS#8 DER private key.
pub fn self_signed_with_key(subject: &str) -> (Vec<u8>, Vec<u8>) {
    let key = SigningKey::random(&mut OsRng);
    let der = build(
        Profile::Root,
        subject,
        &key,
        &key,
        valid_for_an_hour(),
        None,
    );
    let pkcs8 = key
        .to_pkcs8_der()
        .expect("Failed encoding key")
        .as_bytes()
        .to_vec();
    (der, pkcs8)
}

/// A self-signed certificate carrying one URI distribution point per entry.
pub fn self_signed_with_distribution_points(subject: &str, uris: &[&str]) -> Vec<u8> {
    self_signed_with_points(subject, uris.iter().map(|uri| uri_point(uri)).collect())
}

/// A self-signed certificate carrying the given distribution points.
pub fn self_signed_with_points(subject: &str, points: Vec<DistributionPoint>) -> Vec<u8> {
    let key = SigningKey::random(&mut OsRng);
    build(
        Profile::Root,
        subject,
        &key,
        &key,
        valid_for_an_hour(),
        Some(CrlDistributionPoints(points)),
    )
}

/// An empty CRL from `issuer`, signed by a throwaway key.
pub fn crl(issuer: &str) -> Vec<u8> {
    signed_crl(issuer, &SigningKey::random(&mut OsRng), &[])
}

fn signed_crl(issuer: &str, key: &SigningKey, revoked: &[SerialNumber]) -> Vec<u8> {
    let now = SystemTime::now();
    let revoked_certificates: Option<Vec<RevokedCert>> = (!revoked.is_empty()).then(|| {
        revoked
            .iter()
            .map(|serial_number| RevokedCert {
                serial_number: serial_number.clone(),
                revocation_date: utc(now),
                crl_entry_extensions: None,
            })
            .collect()
    });
    let tbs_cert_list: TbsCertList = TbsCertList {
        version: Version::V2,
        signature: ecdsa_with_sha256(),
        issuer: name(issuer),
        this_update: utc(now),
        next_update: Some(utc(now + ONE_HOUR)),
        revoked_certificates,
        crl_extensions: None,
    };
    let tbs = tbs_cert_list.to_der().expect("Failed encoding TBS");
    let signature: DerSignature = key.sign(&tbs);
    let crl: CertificateList = CertificateList {
        tbs_cert_list,
        signature_algorithm: ecdsa_with_sha256(),
        signature: BitString::from_bytes(signature.as_bytes()).expect("Invalid signature"),
    };
    crl.to_der().expect("Failed encoding CRL")
}

/// PEM encode a DER certificate.
pub fn to_pem(der: &[u8]) -> String {
    x509_cert::der::pem::encode_string("CERTIFICATE", LineEnding::LF, der)
        .expect("Failed encoding PEM")
}

/// A certificate authority able to issue leaves and CRLs.
pub struct TestCa {
    key: SigningKey,
    subject: String,
    der: Vec<u8>,
}

impl TestCa {
    pub fn new(subject: &str) -> Self {
        let key = SigningKey::random(&mut OsRng);
        let der = build(
            Profile::Root,
            subject,
            &key,
            &key,
            valid_for_an_hour(),
            None,
        );
        Self {
            key,
            subject: subject.to_string(),
            der,
        }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    fn leaf_profile(&self) -> Profile {
        Profile::Leaf {
            issuer: name(&self.subject),
            enable_key_agreement: false,
            enable_key_encipherment: false,
        }
    }

    /// Issue an end entity certificate with the given distribution point URIs.
    pub fn issue_leaf(&self, subject: &str, uris: &[&str]) -> Vec<u8> {
        let points = (!uris.is_empty())
            .then(|| CrlDistributionPoints(uris.iter().map(|uri| uri_point(uri)).collect()));
        build(
            self.leaf_profile(),
            subject,
            &SigningKey::random(&mut OsRng),
            &self.key,
            valid_for_an_hour(),
            points,
        )
    }

    /// Issue an end entity certificate limited to the given extended key usages.
    pub fn issue_leaf_with_usage(&self, subject: &str, usages: &[ObjectIdentifier]) -> Vec<u8> {
        let subject_key = SigningKey::random(&mut OsRng);
        let mut builder = builder(
            self.leaf_profile(),
            subject,
            &subject_key,
            &self.key,
            valid_for_an_hour(),
        );
        builder
            .add_extension(&ExtendedKeyUsage(usages.to_vec()))
            .expect("Failed adding extended key usage");
        sign(builder)
    }

    pub fn issue_expired_leaf(&self, subject: &str) -> Vec<u8> {
        build(
            self.leaf_profile(),
            subject,
            &SigningKey::random(&mut OsRng),
            &self.key,
            expired_an_hour_ago(),
            None,
        )
    }

    pub fn issue_intermediate(&self, subject: &str) -> TestCa {
        let key = SigningKey::random(&mut OsRng);
        let der = build(
            Profile::SubCA {
                issuer: name(&self.subject),
                path_len_constraint: None,
            },
            subject,
            &key,
            &self.key,
            valid_for_an_hour(),
            None,
        );
        TestCa {
            key,
            subject: subject.to_string(),
            der,
        }
    }

    /// A CRL from this authority revoking `revoked`.
    pub fn crl(&self, revoked: &[SerialNumber]) -> Vec<u8> {
        signed_crl(&self.subject, &self.key, revoked)
    }
}
