//! Integration tests for the signing engine
//!
//! Covers key store loading, certificate validity, the detached CMS
//! signature and the byte-preserving incremental update.

mod common;

use common::{
    certificate, config_for, cover_request, der_len, expired_key_store, key_store_file, plain_request,
    valid_key_store, MemoryStore, ALIAS, LETTER, LOCATION, PASSWORD, SIGNER_CN,
};
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;
use pdf_certifier::config::CertifierConfig;
use pdf_certifier::document::PdfDocument;
use pdf_certifier::request::CertificationRequest;
use pdf_certifier::signatures::{KeyStore, SignOptions, SignatureVerifier, VerificationStatus, SUB_FILTER};
use pdf_certifier::{Certification, Certifier, Error};

fn certify_with(config: CertifierConfig, request: &CertificationRequest, source: Vec<u8>) -> pdf_certifier::Result<Certification> {
    Certifier::new(config).certify(request, &MemoryStore::with(LOCATION, source))
}

fn certify(request: &CertificationRequest, source: Vec<u8>) -> Certification {
    let key_store = valid_key_store();
    certify_with(config_for(&key_store), request, source).expect("certification succeeds")
}

#[test]
fn test_signed_file_preserves_original_bytes() {
    let source = common::classic_pdf(1, LETTER);
    let certification = certify(&cover_request(), source.clone());

    assert_eq!(certification.document.original(), source.as_slice());
    let signed = certification.document.into_bytes();
    assert!(signed.len() > source.len());
    assert_eq!(&signed[..source.len()], source.as_slice());
    assert!(signed.ends_with(b"%%EOF\n"));
}

#[test]
fn test_response_location() {
    let certification = certify(&cover_request(), common::classic_pdf(1, LETTER));
    assert_eq!(certification.response.signed_document_location, "certified/filing-signed.pdf");
}

#[test]
fn test_signature_verifies() {
    let certification = certify(&cover_request(), common::classic_pdf(1, LETTER));
    let byte_range = certification.document.byte_range();
    let signed = certification.document.into_bytes();

    let results = SignatureVerifier::new().verify_document(&signed).expect("verification runs");
    assert_eq!(results.len(), 1);
    let (info, status) = &results[0];
    assert_eq!(*status, VerificationStatus::Valid);
    assert_eq!(info.byte_range, byte_range);
    assert_eq!(info.sub_filter.as_deref(), Some(SUB_FILTER));
    assert_eq!(info.signer_name.as_deref(), Some(SIGNER_CN));
    assert!(info.signing_time.as_deref().is_some_and(|m| m.starts_with("D:")));
}

#[test]
fn test_byte_range_covers_all_but_contents() {
    let certification = certify(&plain_request(), common::classic_pdf(1, LETTER));
    let [start, first_len, second, second_len] = certification.document.byte_range();
    let signed = certification.document.into_bytes();

    assert_eq!(start, 0);
    assert_eq!(second + second_len, signed.len());
    assert_eq!(signed[first_len], b'<');
    assert_eq!(signed[second - 1], b'>');
    assert!(signed[first_len + 1..second - 1].iter().all(u8::is_ascii_hexdigit));
}

#[test]
fn test_signature_verifies_with_openssl() {
    let certification = certify(&cover_request(), common::classic_pdf(1, LETTER));
    let signed = certification.document.into_bytes();
    let doc = PdfDocument::from_bytes(signed.clone()).expect("signed file parses");
    let info = SignatureVerifier::new()
        .find_signatures(&doc)
        .expect("signatures")
        .pop()
        .expect("one signature");

    let [_, first_len, second, second_len] = info.byte_range;
    let mut content = signed[..first_len].to_vec();
    content.extend_from_slice(&signed[second..second + second_len]);

    let der = &info.contents[..der_len(&info.contents)];
    let pkcs7 = Pkcs7::from_der(der).expect("CMS parses");
    let signers = pkcs7
        .signers(&Stack::<X509>::new().expect("stack"), Pkcs7Flags::empty())
        .expect("signer certificates");
    assert_eq!(signers.len(), 1);

    let store = X509StoreBuilder::new().expect("store").build();
    pkcs7
        .verify(
            &Stack::new().expect("stack"),
            &store,
            Some(&content),
            None,
            Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
        )
        .expect("openssl accepts the signature");
}

#[test]
fn test_modified_byte_invalidates_signature() {
    let certification = certify(&cover_request(), common::classic_pdf(1, LETTER));
    let mut signed = certification.document.into_bytes();
    let doc = PdfDocument::from_bytes(signed.clone()).expect("parses");
    let info = SignatureVerifier::new().find_signatures(&doc).expect("signatures").pop().expect("one");

    // A byte inside the original page content, well before /Contents.
    let target = signed
        .windows(b"Original page 1".len())
        .position(|w| w == b"Original page 1")
        .expect("original text present");
    signed[target] = b'X';

    let status = SignatureVerifier::new().verify(&signed, &info).expect("verification runs");
    assert_eq!(status, VerificationStatus::DigestMismatch);
}

#[test]
fn test_appended_bytes_break_coverage() {
    let certification = certify(&plain_request(), common::classic_pdf(1, LETTER));
    let mut signed = certification.document.into_bytes();
    signed.extend_from_slice(b"% trailing\n");

    let results = SignatureVerifier::new().verify_document(&signed).expect("verification runs");
    assert_eq!(results[0].1, VerificationStatus::IncompleteCoverage);
}

#[test]
fn test_page_count_after_signing() {
    let with_cover = PdfDocument::from_bytes(certify(&cover_request(), common::classic_pdf(3, LETTER)).document.into_bytes())
        .expect("parses");
    assert_eq!(with_cover.page_count().expect("count"), 4);

    let without_cover = PdfDocument::from_bytes(certify(&plain_request(), common::classic_pdf(3, LETTER)).document.into_bytes())
        .expect("parses");
    assert_eq!(without_cover.page_count().expect("count"), 3);
}

#[test]
fn test_xref_stream_source() {
    let source = common::xref_stream_pdf(2, LETTER);
    let certification = certify(&cover_request(), source.clone());
    assert_eq!(certification.document.original(), source.as_slice());

    let signed = certification.document.into_bytes();
    let doc = PdfDocument::from_bytes(signed.clone()).expect("parses");
    assert_eq!(doc.page_count().expect("count"), 3);

    let results = SignatureVerifier::new().verify_document(&signed).expect("verification runs");
    assert_eq!(results.len(), 1);
    assert!(results[0].1.is_valid());
}

#[test]
fn test_resigning_adds_second_field() {
    let first = certify(&plain_request(), common::classic_pdf(1, LETTER)).document.into_bytes();
    let second = certify(&plain_request(), first.clone());
    assert_eq!(second.document.original(), first.as_slice());

    let signed = second.document.into_bytes();
    let results = SignatureVerifier::new().verify_document(&signed).expect("verification runs");
    assert_eq!(results.len(), 2);
    // The first signature no longer covers the whole file.
    assert_eq!(results[0].1, VerificationStatus::IncompleteCoverage);
    assert_eq!(results[1].1, VerificationStatus::Valid);
}

#[test]
fn test_sign_options_in_dictionary() {
    let key_store = valid_key_store();
    let config = config_for(&key_store).with_sign_options(
        SignOptions::default()
            .with_reason("Certified true copy")
            .with_location("Cardiff"),
    );
    let signed = certify_with(config, &plain_request(), common::classic_pdf(1, LETTER))
        .expect("certification succeeds")
        .document
        .into_bytes();
    let results = SignatureVerifier::new().verify_document(&signed).expect("verification runs");
    let (info, status) = &results[0];
    assert!(status.is_valid());
    assert_eq!(info.reason.as_deref(), Some("Certified true copy"));
    assert_eq!(info.location.as_deref(), Some("Cardiff"));
    assert_eq!(info.contact_info, None);
}

#[test]
fn test_expired_certificate_is_signing_error() {
    let key_store = expired_key_store();
    let err = certify_with(config_for(&key_store), &cover_request(), common::classic_pdf(1, LETTER))
        .expect_err("expired certificate");
    assert!(matches!(err, Error::Signing(_)), "{:?}", err);
    assert_eq!(err.status_code(), 500);
}

#[test]
fn test_not_yet_valid_certificate_is_signing_error() {
    let (pkey, cert) = certificate(SIGNER_CN, 86_400, 10 * 86_400);
    let key_store = key_store_file(ALIAS, PASSWORD, &pkey, &cert);
    let err = certify_with(config_for(&key_store), &plain_request(), common::classic_pdf(1, LETTER))
        .expect_err("future certificate");
    assert!(matches!(err, Error::Signing(_)), "{:?}", err);
}

#[test]
fn test_wrong_alias_is_configuration_error() {
    let key_store = valid_key_store();
    let config = config_for(&key_store).with_certificate_alias("someone-else");
    let err = certify_with(config, &plain_request(), common::classic_pdf(1, LETTER)).expect_err("unknown alias");
    assert!(matches!(err, Error::SigningConfiguration(_)), "{:?}", err);
}

#[test]
fn test_wrong_password_is_configuration_error() {
    let key_store = valid_key_store();
    let config = config_for(&key_store).with_keystore("PKCS12", key_store.path(), "not-the-password");
    let err = certify_with(config, &plain_request(), common::classic_pdf(1, LETTER)).expect_err("bad password");
    assert!(matches!(err, Error::SigningConfiguration(_)), "{:?}", err);
}

#[test]
fn test_unsupported_store_type_is_configuration_error() {
    let key_store = valid_key_store();
    let config = config_for(&key_store).with_keystore("JKS", key_store.path(), PASSWORD);
    let err = certify_with(config, &plain_request(), common::classic_pdf(1, LETTER)).expect_err("JKS");
    assert!(matches!(err, Error::SigningConfiguration(_)), "{:?}", err);
}

#[test]
fn test_key_store_loads_chain() {
    let key_store = valid_key_store();
    let store = KeyStore::open("PFX", key_store.path(), PASSWORD).expect("opens");
    let session = store
        .load(ALIAS)
        .expect("alias present")
        .validate(chrono::Utc::now())
        .expect("valid now");
    assert_eq!(session.signer_name(), SIGNER_CN);
    assert_eq!(session.chain().len(), 1);
    assert!(!format!("{:?}", session).contains("PRIVATE"));
}

#[test]
fn test_encrypted_source_is_unavailable() {
    // The trailer follows the xref table, so splicing into it keeps every
    // object offset valid.
    let mut source = common::classic_pdf(1, LETTER);
    let needle = b"/Root 1 0 R >>";
    let at = source
        .windows(needle.len())
        .rposition(|w| w == needle)
        .expect("trailer present");
    source.splice(at + needle.len() - 2..at + needle.len() - 2, b"/Encrypt << /Filter /Standard >> ".iter().copied());

    let key_store = valid_key_store();
    let err = certify_with(config_for(&key_store), &plain_request(), source).expect_err("encrypted");
    assert!(matches!(err, Error::DocumentUnavailable(_)), "{:?}", err);
}

#[test]
fn test_missing_document_forwards_status() {
    let key_store = valid_key_store();
    let err = Certifier::new(config_for(&key_store))
        .certify(&plain_request(), &MemoryStore::default())
        .expect_err("missing");
    assert_eq!(err.status_code(), 404);
}
