//! Signature dictionary options and read-back results.

use chrono::{DateTime, Utc};

/// `/SubFilter` written into every signature dictionary.
pub const SUB_FILTER: &str = "adbe.pkcs7.detached";

/// `/Filter` written into every signature dictionary.
pub const FILTER: &str = "Adobe.PPKLite";

/// Optional descriptive entries of the signature dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignOptions {
    /// `/Reason`
    pub reason: Option<String>,
    /// `/Location`
    pub location: Option<String>,
    /// `/ContactInfo`
    pub contact_info: Option<String>,
}

impl SignOptions {
    /// Set the reason for signing.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the signing location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the contact information.
    pub fn with_contact_info(mut self, contact_info: impl Into<String>) -> Self {
        self.contact_info = Some(contact_info.into());
        self
    }
}

/// Format a time as a PDF date string, `D:YYYYMMDDHHmmSS+00'00'`.
pub fn pdf_date(at: &DateTime<Utc>) -> String {
    at.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

/// Signature found in a signed file.
#[derive(Debug, Clone, Default)]
pub struct SignatureInfo {
    /// `/Name`
    pub signer_name: Option<String>,
    /// `/M` as written
    pub signing_time: Option<String>,
    /// `/Reason`
    pub reason: Option<String>,
    /// `/Location`
    pub location: Option<String>,
    /// `/ContactInfo`
    pub contact_info: Option<String>,
    /// `/SubFilter`
    pub sub_filter: Option<String>,
    /// `/ByteRange`
    pub byte_range: [usize; 4],
    /// `/Contents`, including any zero padding
    pub contents: Vec<u8>,
}

/// Outcome of an integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Digest and signature both check out
    Valid,
    /// Covered bytes no longer match the signed digest
    DigestMismatch,
    /// The CMS signature does not verify with the signer's key
    InvalidSignature,
    /// The byte range does not cover the whole file
    IncompleteCoverage,
}

impl VerificationStatus {
    /// Whether the signature is intact.
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationStatus::Valid)
    }
}
