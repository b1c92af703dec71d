//! Certification requests and responses.
//!
//! Every request field is optional at the serde level, so that an absent
//! field is reported by [`CertificationRequest::validate`] with a message
//! naming it instead of failing deserialization.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Signature option that asks for a generated cover page.
pub const COVER_SHEET_OPTION: &str = "cover-sheet";

/// A request to certify one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationRequest {
    /// Locator of the unsigned document, `s3://bucket/key`
    pub document_location: Option<String>,
    /// Kind of document being certified
    pub document_type: Option<String>,
    /// Enabled behaviours, such as `cover-sheet`
    pub signature_options: Option<Vec<String>>,
    /// Destination prefix of the signed document
    pub prefix: Option<String>,
    /// Destination key of the signed document
    pub key: Option<String>,
    /// Cover page content
    pub cover_sheet_data: Option<CoverSheetData>,
    /// Values for `{name}` placeholders in the filing description
    pub filing_history_description_values: Option<HashMap<String, String>>,
}

/// Content of the generated cover page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverSheetData {
    /// Company name line
    pub company_name: Option<String>,
    /// Company number line
    pub company_number: Option<String>,
    /// Filing type code appended to the description, e.g. `AD01`
    pub filing_history_type: Option<String>,
    /// Description with an optional `**bold**` head and `{name}` placeholders
    pub filing_history_description: Option<String>,
}

impl CoverSheetData {
    /// `(company_name, company_number, filing_history_type,
    /// filing_history_description)`, or a validation error naming the
    /// absent fields.
    pub fn required_fields(&self) -> Result<(&str, &str, &str, &str)> {
        match (
            self.company_name.as_deref(),
            self.company_number.as_deref(),
            self.filing_history_type.as_deref(),
            self.filing_history_description.as_deref(),
        ) {
            (Some(name), Some(number), Some(kind), Some(description)) => Ok((name, number, kind, description)),
            _ => Err(Error::Validation(self.errors())),
        }
    }

    fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.filing_history_type.is_none() || self.filing_history_description.is_none() {
            errors.push(
                "cover_sheet_data is missing fields: filing_history_type and filing_history_description are required"
                    .to_string(),
            );
        }
        if self.company_name.is_none() {
            errors.push("cover_sheet_data.company_name is missing".to_string());
        }
        if self.company_number.is_none() {
            errors.push("cover_sheet_data.company_number is missing".to_string());
        }
        errors
    }
}

impl CertificationRequest {
    /// Parse a request from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether a signature option is enabled.
    pub fn has_option(&self, option: &str) -> bool {
        self.signature_options
            .as_ref()
            .is_some_and(|options| options.iter().any(|o| o == option))
    }

    /// Whether a cover page is requested.
    pub fn wants_cover_sheet(&self) -> bool {
        self.has_option(COVER_SHEET_OPTION)
    }

    /// Every rule violation; empty when the request is valid.
    ///
    /// Rules are checked independently and only for presence; field
    /// contents are never inspected.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("document_location", &self.document_location),
            ("document_type", &self.document_type),
            ("prefix", &self.prefix),
            ("key", &self.key),
        ] {
            if value.is_none() {
                errors.push(format!("{} is missing", name));
            }
        }

        if self.wants_cover_sheet() {
            match &self.cover_sheet_data {
                None => errors.push("cover_sheet_data is required when the cover-sheet option is set".to_string()),
                Some(data) => errors.extend(data.errors()),
            }
        }
        errors
    }

    /// [`validate`](Self::validate) as a `Result`.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }

    /// Placeholder values, empty when none were sent.
    pub fn description_values(&self) -> HashMap<String, String> {
        self.filing_history_description_values.clone().unwrap_or_default()
    }

    /// `prefix/key` of the signed document.
    pub fn signed_document_location(&self) -> Option<String> {
        match (self.prefix.as_deref(), self.key.as_deref()) {
            (Some(prefix), Some(key)) => Some(format!("{}/{}", prefix.trim_end_matches('/'), key)),
            _ => None,
        }
    }
}

/// Body of a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationResponse {
    /// Where the signed document is to be stored
    pub signed_document_location: String,
}

impl CertificationResponse {
    /// Status of a successful certification.
    pub const STATUS: u16 = 201;
}

/// Body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Upstream status for storage failures, 400 for invalid requests,
    /// otherwise 500
    pub status: u16,
    /// Human-readable reason
    pub message: String,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}
