//! Error types for the certification pipeline.
//!
//! The low-level variants come from reading and writing PDF structure. The
//! pipeline maps them onto the five request-level categories
//! (`Validation`, `DocumentUnavailable`, `CoverSheet`, `SigningConfiguration`,
//! `Signing`) at stage boundaries.

/// Result type alias for certifier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while certifying a document.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// The certification request is malformed or incomplete.
    #[error("Invalid certification request: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The source document could not be fetched or parsed.
    #[error("Document unavailable: {0}")]
    DocumentUnavailable(String),

    /// The storage collaborator failed with its own status code.
    #[error("Storage request failed with status {status}: {message}")]
    Storage {
        /// Upstream status code
        status: u16,
        /// Upstream message
        message: String,
    },

    /// Composing or rendering the cover page failed.
    #[error("Failed to compose cover sheet: {0}")]
    CoverSheet(#[source] Box<Error>),

    /// Key store, alias or certificate chain problem.
    #[error("Signing configuration error: {0}")]
    SigningConfiguration(String),

    /// Certificate validity or cryptographic failure.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// A description value named as a date is not an ISO calendar date.
    #[error("Value '{value}' for '{key}' is not a date in YYYY-MM-DD form")]
    InvalidDate {
        /// Placeholder name
        key: String,
        /// Raw value
        value: String,
    },

    /// Image error
    #[error("Image error: {0}")]
    Image(String),

    /// Circular reference detected in object graph
    #[error("Circular reference detected: object {0}")]
    CircularReference(crate::object::ObjectRef),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// HTTP-style status code for the caller-visible response.
    ///
    /// Storage failures forward the upstream status; a validation failure is
    /// a client error; everything else is a generic server error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Storage { status, .. } => *status,
            Error::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Wrap a lower-level failure raised while building the cover page.
    pub(crate) fn cover_sheet(cause: Error) -> Self {
        match cause {
            already @ Error::CoverSheet(_) => already,
            other => Error::CoverSheet(Box::new(other)),
        }
    }

    /// Treat a parse failure of the source as an unavailable document.
    pub(crate) fn document_unavailable(cause: Error) -> Self {
        match cause {
            already @ (Error::DocumentUnavailable(_) | Error::Storage { .. }) => already,
            other => Error::DocumentUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_validation_error_lists_every_message() {
        let err = Error::Validation(vec!["prefix is missing".into(), "key is missing".into()]);
        let msg = format!("{}", err);
        assert!(msg.contains("prefix is missing"));
        assert!(msg.contains("key is missing"));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_storage_error_forwards_status() {
        let err = Error::Storage {
            status: 404,
            message: "NoSuchKey".to_string(),
        };
        assert_eq!(err.status_code(), 404);
        assert!(format!("{}", err).contains("NoSuchKey"));
    }

    #[test]
    fn test_cover_sheet_error_keeps_cause() {
        let err = Error::cover_sheet(Error::ObjectNotFound(7, 0));
        assert_eq!(err.status_code(), 500);
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("7 0 R"));
    }

    #[test]
    fn test_cover_sheet_error_not_double_wrapped() {
        let err = Error::cover_sheet(Error::cover_sheet(Error::InvalidXref));
        match err {
            Error::CoverSheet(inner) => assert!(matches!(*inner, Error::InvalidXref)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_document_unavailable_from_parse_error() {
        let err = Error::document_unavailable(Error::InvalidHeader("GIF89a".into()));
        assert!(matches!(err, Error::DocumentUnavailable(ref m) if m.contains("GIF89a")));
    }

    #[test]
    fn test_object_not_found_error() {
        let err = Error::ObjectNotFound(10, 0);
        let msg = format!("{}", err);
        assert!(msg.contains("10 0 R"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
