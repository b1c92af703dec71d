//! The certification pipeline.
//!
//! Validate the request, fetch and parse the document, compose the cover
//! page and signature panel when asked, place the signature field and
//! sign. Each stage maps its failures onto the request-level error
//! categories and the pipeline stops at the first one.

use crate::appearance::{place_signature_field, render_panel, PanelText, SignatureFieldHandle, SignaturePage};
use crate::config::CertifierConfig;
use crate::cover::compose;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::request::{CertificationRequest, CertificationResponse};
use crate::signatures::{PdfSigner, SignedDocument};
use crate::storage::DocumentStore;
use crate::writer::IncrementalUpdate;
use chrono::{DateTime, Utc};

/// Outcome of a successful certification.
#[derive(Debug, Clone)]
pub struct Certification {
    /// Response body for the caller
    pub response: CertificationResponse,
    /// The signed file
    pub document: SignedDocument,
    /// Where the signature field was placed
    pub field: SignatureFieldHandle,
}

/// Certifies documents with one configuration.
///
/// Holds no per-request state; key material is loaded afresh for every
/// request and dropped when it completes.
#[derive(Debug, Clone)]
pub struct Certifier {
    config: CertifierConfig,
}

impl Certifier {
    /// Create a certifier.
    pub fn new(config: CertifierConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &CertifierConfig {
        &self.config
    }

    /// Certify the requested document, signing at the current time.
    pub fn certify(&self, request: &CertificationRequest, store: &dyn DocumentStore) -> Result<Certification> {
        self.certify_at(request, store, Utc::now())
    }

    /// Certify the requested document, signing at `now`.
    pub fn certify_at(
        &self,
        request: &CertificationRequest,
        store: &dyn DocumentStore,
        now: DateTime<Utc>,
    ) -> Result<Certification> {
        let location = request.document_location.as_deref().unwrap_or("<none>");
        log::info!("Certifying {}", location);
        match self.run(request, store, now) {
            Ok(certification) => {
                log::info!(
                    "Certified {} as {} ({} bytes)",
                    location,
                    certification.response.signed_document_location,
                    certification.document.len()
                );
                Ok(certification)
            },
            Err(err) => {
                log::error!("Certification of {} failed: {}", location, err);
                Err(err)
            },
        }
    }

    fn run(
        &self,
        request: &CertificationRequest,
        store: &dyn DocumentStore,
        now: DateTime<Utc>,
    ) -> Result<Certification> {
        request.ensure_valid()?;
        let (Some(location), Some(signed_location)) =
            (request.document_location.as_deref(), request.signed_document_location())
        else {
            return Err(Error::Validation(request.validate()));
        };

        let bytes = store.retrieve(location).map_err(Error::document_unavailable)?;
        let doc = PdfDocument::from_bytes(bytes).map_err(Error::document_unavailable)?;
        log::debug!("Parsed {}: {:?}", location, doc);

        let mut update = IncrementalUpdate::new(&doc);
        let signature = update.allocate();
        let panel = PanelText::new(self.config.authority_name.clone(), now, self.config.status_url.clone());

        let field = match (&request.cover_sheet_data, request.wants_cover_sheet()) {
            (Some(data), true) => {
                let mut cover = compose(
                    &doc,
                    &mut update,
                    data,
                    &request.description_values(),
                    &self.config.authority_name,
                )?;
                let stamp = self.config.stamp().map_err(Error::cover_sheet)?;
                render_panel(&mut cover, &mut update, &stamp, &panel).map_err(Error::cover_sheet)?;
                let field = place_signature_field(&doc, &mut update, SignaturePage::Cover(&mut cover), signature, &panel)?;
                cover.finish(&mut update).map_err(Error::cover_sheet)?;
                field
            },
            _ => {
                let pages = doc.pages().map_err(Error::document_unavailable)?;
                let first = pages
                    .first()
                    .ok_or_else(|| Error::DocumentUnavailable(format!("{} has no pages", location)))?;
                place_signature_field(&doc, &mut update, SignaturePage::Existing(first), signature, &panel)?
            },
        };

        let session = self.config.signing_session(now)?;
        let document = PdfSigner::new(&session, self.config.sign_options.clone()).sign(doc, update, signature, now)?;

        Ok(Certification {
            response: CertificationResponse {
                signed_document_location: signed_location,
            },
            document,
            field,
        })
    }
}
