// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Certifier
//!
//! Certify PDF documents: validate a certification request, optionally
//! prepend a generated cover sheet with a visual signature panel, and embed
//! a detached CMS signature through an incremental update that leaves every
//! original byte in place.
//!
//! ## Core Features
//!
//! ### Reading
//! - **Classic and stream cross-references**: `xref` tables, `/XRef`
//!   streams, object streams and hybrid files, following `/Prev`
//! - **Page tree walk**: inherited `/MediaBox` and `/Resources`
//!
//! ### Cover Sheet
//! - **Mixed-weight description**: a `**bold**` head followed by a plain
//!   tail on one wrapped line sequence
//! - **Placeholder substitution**: `{name}` values, ISO dates written in
//!   long form
//! - **Signature panel**: stamp image, signing time, status link
//!
//! ### Signing
//! - **PKCS#12 key stores**: alias lookup, validity window check
//! - **CMS detached signatures**: SHA-256 with RSA, `adbe.pkcs7.detached`
//! - **Incremental update**: the signed file is the original file plus an
//!   appended section
//! - **Self-check**: [`signatures::SignatureVerifier`] recomputes the digest
//!   and checks the CMS signature
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_certifier::config::CertifierConfig;
//! use pdf_certifier::request::CertificationRequest;
//! use pdf_certifier::storage::FileSystemStore;
//! use pdf_certifier::Certifier;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CertifierConfig::from_env()?;
//! let store = FileSystemStore::new(&config.store_root);
//! let request = CertificationRequest::from_json(&std::fs::read_to_string("request.json")?)?;
//!
//! let certification = Certifier::new(config).certify(&request, &store)?;
//! std::fs::write("signed.pdf", certification.document.into_bytes())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
pub mod xref;

// Stream decoders
pub mod decoders;

// Text layout
pub mod layout;

// PDF writing
pub mod writer;

// Certification
pub mod appearance;
pub mod config;
pub mod cover;
pub mod pipeline;
pub mod request;
pub mod signatures;
pub mod storage;

// Re-exports
pub use document::PdfDocument;
pub use error::{Error, Result};
pub use pipeline::{Certification, Certifier};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
