//! Detached CMS SignedData (`adbe.pkcs7.detached`).
//!
//! The content is not encapsulated; its SHA-256 digest is supplied as an
//! external message digest. Signed attributes are content-type,
//! message-digest and signing-time, signed with RSA PKCS#1 v1.5.

use super::keystore::SigningSession;
use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Utc};
use cms::builder::{SignedDataBuilder, SignerInfoBuilder};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::signed_data::{EncapsulatedContentInfo, SignerIdentifier};
use const_oid::db::rfc5911::{ID_DATA, ID_SIGNING_TIME};
use const_oid::db::rfc5912::ID_SHA_256;
use der::asn1::{GeneralizedTime, SetOfVec, UtcTime};
use der::{Any, Encode};
use rsa::pkcs1v15::{Signature, SigningKey};
use sha2::Sha256;
use spki::AlgorithmIdentifierOwned;
use std::time::SystemTime;
use x509_cert::attr::Attribute;
use x509_cert::time::Time;

const UTC_TIME_END_YEAR: i32 = 2050;

/// Build the DER-encoded ContentInfo signing `digest`.
pub fn build_detached_signature(
    session: &SigningSession,
    digest: &[u8],
    signing_time: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let leaf = session.chain().leaf();
    let signer = SigningKey::<Sha256>::new(session.private_key().clone());
    let content = EncapsulatedContentInfo {
        econtent_type: ID_DATA,
        econtent: None,
    };
    let digest_algorithm = AlgorithmIdentifierOwned {
        oid: ID_SHA_256,
        parameters: None,
    };
    let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
        issuer: leaf.tbs_certificate.issuer.clone(),
        serial_number: leaf.tbs_certificate.serial_number.clone(),
    });

    let mut signer_info = SignerInfoBuilder::new(&signer, sid, digest_algorithm.clone(), &content, Some(digest))
        .map_err(|e| cms_error("signer info", e))?;
    signer_info
        .add_signed_attribute(signing_time_attribute(signing_time)?)
        .map_err(|e| cms_error("signing-time attribute", e))?;

    let mut signed_data = SignedDataBuilder::new(&content);
    signed_data
        .add_digest_algorithm(digest_algorithm)
        .map_err(|e| cms_error("digest algorithm", e))?;
    for cert in session.chain().certificates() {
        signed_data
            .add_certificate(CertificateChoices::Certificate(cert.clone()))
            .map_err(|e| cms_error("certificate", e))?;
    }
    let content_info = signed_data
        .add_signer_info::<SigningKey<Sha256>, Signature>(signer_info)
        .map_err(|e| cms_error("signature", e))?
        .build()
        .map_err(|e| cms_error("signed data", e))?;

    let der = content_info
        .to_der()
        .map_err(|e| Error::Signing(format!("Cannot encode signature: {}", e)))?;
    log::debug!("Built CMS signature: {} bytes, {} certificate(s)", der.len(), session.chain().len());
    Ok(der)
}

/// Signing-time attribute carrying `at` rather than the clock at build
/// time, so it matches the dictionary's `/M`.
fn signing_time_attribute(at: DateTime<Utc>) -> Result<Attribute> {
    let time = signing_time_value(at)?;
    let value = Any::encode_from(&time).map_err(|e| Error::Signing(format!("Cannot encode signing time: {}", e)))?;
    let values = SetOfVec::try_from(vec![value])
        .map_err(|e| Error::Signing(format!("Cannot encode signing time: {}", e)))?;
    Ok(Attribute {
        oid: ID_SIGNING_TIME,
        values,
    })
}

/// UTCTime for 1950 through 2049, GeneralizedTime otherwise (RFC 5652
/// section 11.3).
fn signing_time_value(at: DateTime<Utc>) -> Result<Time> {
    let system_time = SystemTime::from(at);
    let out_of_range = |e: der::Error| Error::Signing(format!("Signing time out of range: {}", e));
    if (1950..UTC_TIME_END_YEAR).contains(&at.year()) {
        Ok(Time::UtcTime(UtcTime::from_system_time(system_time).map_err(out_of_range)?))
    } else {
        Ok(Time::GeneralTime(
            GeneralizedTime::from_system_time(system_time).map_err(out_of_range)?,
        ))
    }
}

fn cms_error(stage: &str, err: impl std::fmt::Debug) -> Error {
    Error::Signing(format!("CMS {} failed: {:?}", stage, err))
}
