//! PDF signing.
//!
//! The signature dictionary is staged with fixed-width placeholders,
//! the update is serialised, the ByteRange is patched in, the covered
//! bytes are digested and the CMS signature is hex-written into the
//! `/Contents` slot. Only the appended update is ever modified; the
//! original file is carried through untouched.

use super::byterange::{digest_parts, ByteRangeCalculator};
use super::signed_data::build_detached_signature;
use super::keystore::SigningSession;
use super::types::{pdf_date, SignOptions, FILTER, SUB_FILTER};
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::writer::{IncrementalUpdate, ObjectSerializer};
use chrono::{DateTime, Utc};

/// Original file plus the signed update appended to it.
#[derive(Debug, Clone)]
pub struct SignedDocument {
    original: Vec<u8>,
    delta: Vec<u8>,
    byte_range: [usize; 4],
}

impl SignedDocument {
    /// Bytes of the source document, unchanged.
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    /// Bytes appended by certification.
    pub fn delta(&self) -> &[u8] {
        &self.delta
    }

    /// ByteRange written into the signature dictionary.
    pub fn byte_range(&self) -> [usize; 4] {
        self.byte_range
    }

    /// Total length.
    pub fn len(&self) -> usize {
        self.original.len() + self.delta.len()
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The complete signed file.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = self.original;
        out.extend_from_slice(&self.delta);
        out
    }
}

/// PDF signer that creates digital signatures.
pub struct PdfSigner<'a> {
    session: &'a SigningSession,
    options: SignOptions,
    byte_range_calc: ByteRangeCalculator,
}

impl<'a> PdfSigner<'a> {
    /// Signer using validated key material; the placeholder is sized from
    /// its chain.
    pub fn new(session: &'a SigningSession, options: SignOptions) -> Self {
        Self {
            session,
            options,
            byte_range_calc: ByteRangeCalculator::for_chain(session.chain().der_len()),
        }
    }

    /// Override the reserved signature size.
    pub fn with_reserved_size(mut self, reserved: usize) -> Self {
        self.byte_range_calc = ByteRangeCalculator::new(reserved);
        self
    }

    /// DER bytes reserved for the signature.
    pub fn reserved_size(&self) -> usize {
        self.byte_range_calc.reserved()
    }

    /// Signature dictionary with ByteRange and Contents placeholders.
    pub fn build_signature_dictionary(&self, signing_time: &DateTime<Utc>) -> Object {
        let mut entries = vec![
            ("Type", ObjectSerializer::name("Sig")),
            ("Filter", ObjectSerializer::name(FILTER)),
            ("SubFilter", ObjectSerializer::name(SUB_FILTER)),
            ("ByteRange", ByteRangeCalculator::byte_range_placeholder()),
            ("Contents", self.byte_range_calc.contents_placeholder()),
            ("M", ObjectSerializer::string(&pdf_date(signing_time))),
            ("Name", ObjectSerializer::text_string(self.session.signer_name())),
        ];
        for (key, value) in [
            ("Reason", &self.options.reason),
            ("Location", &self.options.location),
            ("ContactInfo", &self.options.contact_info),
        ] {
            if let Some(value) = value {
                entries.push((key, ObjectSerializer::text_string(value)));
            }
        }
        ObjectSerializer::dict(entries)
    }

    /// Stage the signature dictionary at `signature`, write the update and
    /// sign it.
    ///
    /// `signature` must already be allocated in `update` and referenced by
    /// the signature field's `/V`.
    pub fn sign(
        &self,
        doc: PdfDocument,
        mut update: IncrementalUpdate,
        signature: ObjectRef,
        signing_time: DateTime<Utc>,
    ) -> Result<SignedDocument> {
        update.set(signature, self.build_signature_dictionary(&signing_time));
        let written = update.write(&doc)?;
        let base_len = written.base_len;
        let total_len = written.len();

        let span = written
            .object_span(signature)
            .ok_or_else(|| Error::Signing("Signature dictionary missing from update".to_string()))?;
        let window = written
            .slice(span.clone())
            .ok_or_else(|| Error::Signing("Signature dictionary outside the update".to_string()))?;
        let range_slot = ByteRangeCalculator::find_byte_range(window)
            .ok_or_else(|| Error::Signing("ByteRange placeholder not found".to_string()))?;
        let contents_offset = span.start
            + ByteRangeCalculator::find_contents_offset(window)
                .ok_or_else(|| Error::Signing("Contents placeholder not found".to_string()))?;

        let byte_range = self.byte_range_calc.calculate_byte_range(total_len, contents_offset);
        let patched = ByteRangeCalculator::format_byte_range(&byte_range)?;
        if patched.len() != range_slot.len() {
            return Err(Error::Signing("ByteRange placeholder has unexpected width".to_string()));
        }

        let mut delta = written.delta;
        let range_start = span.start - base_len + range_slot.start;
        delta[range_start..range_start + patched.len()].copy_from_slice(patched.as_bytes());

        let original = doc.into_bytes();
        let local_contents = contents_offset - base_len;
        let local_after = byte_range[2] - base_len;
        let digest = digest_parts(&[original.as_slice(), &delta[..local_contents], &delta[local_after..]]);

        let cms = build_detached_signature(self.session, &digest, signing_time)?;
        self.byte_range_calc.insert_signature(&mut delta, local_contents, &cms)?;

        log::info!(
            "Signed document as '{}': ByteRange {:?}, signature {} of {} reserved bytes",
            self.session.signer_name(),
            byte_range,
            cms.len(),
            self.byte_range_calc.reserved()
        );
        Ok(SignedDocument {
            original,
            delta,
            byte_range,
        })
    }

    /// The descriptive options.
    pub fn options(&self) -> &SignOptions {
        &self.options
    }
}
