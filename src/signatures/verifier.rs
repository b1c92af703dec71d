//! Integrity check of embedded signatures.
//!
//! Recomputes the digest over each signature's byte range and checks the
//! CMS signature over the signed attributes with the signer certificate
//! embedded in it. Trust in that certificate is not evaluated.

use super::byterange::{digest_parts, ByteRangeCalculator};
use super::types::{SignatureInfo, VerificationStatus};
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{Dict, Object};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use const_oid::db::rfc5911::ID_MESSAGE_DIGEST;
use der::asn1::OctetString;
use der::{Decode, Encode, SliceReader};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha2::Sha256;
use signature::Verifier;

/// Checks the signatures of a signed file.
#[derive(Debug, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Create a new signature verifier.
    pub fn new() -> Self {
        Self
    }

    /// Every signature referenced by a `/FT /Sig` field of the AcroForm.
    pub fn find_signatures(&self, doc: &PdfDocument) -> Result<Vec<SignatureInfo>> {
        let catalog = doc.catalog()?;
        let Some(form) = catalog.get("AcroForm") else {
            return Ok(Vec::new());
        };
        let form = doc.resolve(form)?;
        let fields = match form.as_dict().and_then(|f| f.get("Fields")) {
            Some(fields) => doc.resolve(fields)?,
            None => return Ok(Vec::new()),
        };

        let mut found = Vec::new();
        for field in fields.as_array().map(Vec::as_slice).unwrap_or_default() {
            let field = doc.resolve(field)?;
            let Some(field) = field.as_dict() else { continue };
            if field.get("FT").and_then(Object::as_name) != Some("Sig") {
                continue;
            }
            if let Some(value) = field.get("V") {
                if let Object::Dictionary(sig) = doc.resolve(value)? {
                    found.push(self.extract_signature_info(&sig)?);
                }
            }
        }
        Ok(found)
    }

    /// Extract signature information from a signature dictionary.
    pub fn extract_signature_info(&self, dict: &Dict) -> Result<SignatureInfo> {
        let text = |key: &str| dict.get(key).and_then(Object::as_text);

        let byte_range: Vec<usize> = dict
            .get("ByteRange")
            .and_then(Object::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Object::as_integer)
                    .filter_map(|n| usize::try_from(n).ok())
                    .collect()
            })
            .unwrap_or_default();
        let byte_range: [usize; 4] = byte_range
            .try_into()
            .map_err(|_| Error::InvalidPdf("Signature /ByteRange must hold four offsets".to_string()))?;

        let contents = dict
            .get("Contents")
            .and_then(Object::as_string)
            .ok_or_else(|| Error::InvalidPdf("Signature has no /Contents".to_string()))?
            .to_vec();

        Ok(SignatureInfo {
            signer_name: text("Name"),
            signing_time: text("M"),
            reason: text("Reason"),
            location: text("Location"),
            contact_info: text("ContactInfo"),
            sub_filter: dict.get("SubFilter").and_then(Object::as_name).map(str::to_string),
            byte_range,
            contents,
        })
    }

    /// Check one signature against the file it was read from.
    pub fn verify(&self, data: &[u8], info: &SignatureInfo) -> Result<VerificationStatus> {
        if ByteRangeCalculator::validate_byte_range(&info.byte_range, data.len()).is_err() {
            return Ok(VerificationStatus::IncompleteCoverage);
        }
        let [_, before, after, after_len] = info.byte_range;
        let digest = digest_parts(&[&data[..before], &data[after..after + after_len]]);

        let signed_data = decode_signed_data(&info.contents)?;
        let signer = signed_data
            .signer_infos
            .0
            .iter()
            .next()
            .ok_or_else(|| malformed("no signer info"))?;

        let signed_attrs = signer
            .signed_attrs
            .as_ref()
            .ok_or_else(|| malformed("no signed attributes"))?;
        let message_digest = signed_attrs
            .iter()
            .find(|attr| attr.oid == ID_MESSAGE_DIGEST)
            .and_then(|attr| attr.values.iter().next())
            .ok_or_else(|| malformed("no message digest"))?
            .decode_as::<OctetString>()
            .map_err(|e| malformed(&e.to_string()))?;
        if message_digest.as_bytes() != digest.as_slice() {
            log::warn!("Signature digest does not match the covered bytes");
            return Ok(VerificationStatus::DigestMismatch);
        }

        let public_key = signer_public_key(&signed_data, signer)?;
        let signature =
            Signature::try_from(signer.signature.as_bytes()).map_err(|e| malformed(&e.to_string()))?;
        let attrs_der = signed_attrs.to_der().map_err(|e| malformed(&e.to_string()))?;
        match VerifyingKey::<Sha256>::new(public_key).verify(&attrs_der, &signature) {
            Ok(()) => Ok(VerificationStatus::Valid),
            Err(_) => Ok(VerificationStatus::InvalidSignature),
        }
    }

    /// Find and check every signature of a signed file.
    pub fn verify_document(&self, data: &[u8]) -> Result<Vec<(SignatureInfo, VerificationStatus)>> {
        let doc = PdfDocument::from_bytes(data.to_vec())?;
        self.find_signatures(&doc)?
            .into_iter()
            .map(|info| {
                let status = self.verify(data, &info)?;
                Ok((info, status))
            })
            .collect()
    }
}

/// ContentInfo wrapping SignedData; trailing placeholder padding is ignored.
fn decode_signed_data(contents: &[u8]) -> Result<SignedData> {
    let mut reader = SliceReader::new(contents).map_err(|e| malformed(&e.to_string()))?;
    let content_info = ContentInfo::decode(&mut reader).map_err(|e| malformed(&e.to_string()))?;
    content_info
        .content
        .decode_as::<SignedData>()
        .map_err(|e| malformed(&e.to_string()))
}

fn signer_public_key(signed_data: &SignedData, signer: &SignerInfo) -> Result<RsaPublicKey> {
    let SignerIdentifier::IssuerAndSerialNumber(id) = &signer.sid else {
        return Err(malformed("signer identified by key id"));
    };
    let certificate = signed_data
        .certificates
        .iter()
        .flat_map(|set| set.0.iter())
        .find_map(|choice| match choice {
            CertificateChoices::Certificate(cert)
                if cert.tbs_certificate.issuer == id.issuer
                    && cert.tbs_certificate.serial_number == id.serial_number =>
            {
                Some(cert)
            },
            _ => None,
        })
        .ok_or_else(|| malformed("signer certificate not embedded"))?;

    let spki = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| malformed(&e.to_string()))?;
    RsaPublicKey::from_public_key_der(&spki).map_err(|e| malformed(&e.to_string()))
}

fn malformed(reason: &str) -> Error {
    Error::InvalidPdf(format!("Malformed signature: {}", reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ObjectSerializer;

    fn sig_dict() -> Dict {
        ObjectSerializer::dict_map(vec![
            ("Type", ObjectSerializer::name("Sig")),
            ("Filter", ObjectSerializer::name("Adobe.PPKLite")),
            ("SubFilter", ObjectSerializer::name("adbe.pkcs7.detached")),
            (
                "ByteRange",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(100),
                    Object::Integer(200),
                    Object::Integer(50),
                ]),
            ),
            ("Contents", Object::String(vec![0; 8])),
            ("Name", ObjectSerializer::string("Test Signer")),
            ("Reason", ObjectSerializer::string("Testing")),
            ("M", ObjectSerializer::string("D:20240101120000+00'00'")),
        ])
    }

    #[test]
    fn test_extract_signature_info() {
        let info = SignatureVerifier::new().extract_signature_info(&sig_dict()).unwrap();
        assert_eq!(info.signer_name.as_deref(), Some("Test Signer"));
        assert_eq!(info.reason.as_deref(), Some("Testing"));
        assert_eq!(info.sub_filter.as_deref(), Some("adbe.pkcs7.detached"));
        assert_eq!(info.byte_range, [0, 100, 200, 50]);
        assert_eq!(info.contents.len(), 8);
    }

    #[test]
    fn test_short_byte_range_rejected() {
        let mut dict = sig_dict();
        dict.insert("ByteRange".into(), Object::Array(vec![Object::Integer(0)]));
        assert!(SignatureVerifier::new().extract_signature_info(&dict).is_err());
    }

    #[test]
    fn test_partial_coverage_detected() {
        let info = SignatureVerifier::new().extract_signature_info(&sig_dict()).unwrap();
        let status = SignatureVerifier::new().verify(&[0u8; 300], &info).unwrap();
        assert_eq!(status, VerificationStatus::IncompleteCoverage);
    }

    #[test]
    fn test_zero_contents_is_malformed() {
        let info = SignatureVerifier::new().extract_signature_info(&sig_dict()).unwrap();
        assert!(SignatureVerifier::new().verify(&[0u8; 250], &info).is_err());
    }
}
