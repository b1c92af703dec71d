//! PDF digital signatures.
//!
//! Key material is loaded from a PKCS#12 key store ([`KeyStore`]) and checked
//! against the leaf certificate's validity window, producing a
//! [`SigningSession`]. [`PdfSigner`] then embeds a detached CMS signature
//! (`adbe.pkcs7.detached`, SHA-256 with RSA) through an incremental update.
//! [`SignatureVerifier`] checks the digest and CMS signature of a signed
//! file.
//!
//! ## PDF Specification Reference
//!
//! - ISO 32000-1:2008 Section 12.8 - Digital Signatures
//! - RFC 5652 - Cryptographic Message Syntax

mod byterange;
mod keystore;
mod signed_data;
mod signer;
mod types;
mod verifier;

pub use byterange::{digest_parts, ByteRangeCalculator, MIN_RESERVED};
pub use keystore::{CertificateChain, KeyStore, KeyStoreType, LoadedKey, SigningSession};
pub use signed_data::build_detached_signature;
pub use signer::{PdfSigner, SignedDocument};
pub use types::{pdf_date, SignOptions, SignatureInfo, VerificationStatus, FILTER, SUB_FILTER};
pub use verifier::SignatureVerifier;
