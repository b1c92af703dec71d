//! Integration tests for signature field placement
//!
//! The field sits 25pt from the left edge with its top edge 94pt above the
//! page bottom, 120x20pt, whatever the page height.

mod common;

use common::{config_for, cover_request, plain_request, valid_key_store, MemoryStore, A4, LETTER, LOCATION};
use pdf_certifier::appearance::signature_rect;
use pdf_certifier::document::PdfDocument;
use pdf_certifier::layout::Rect;
use pdf_certifier::object::{Dict, Object, ObjectRef};
use pdf_certifier::request::CertificationRequest;
use pdf_certifier::{Certification, Certifier};

fn certify(request: &CertificationRequest, source: Vec<u8>) -> (Certification, PdfDocument) {
    let key_store = valid_key_store();
    let certification = Certifier::new(config_for(&key_store))
        .certify(request, &MemoryStore::with(LOCATION, source))
        .expect("certification succeeds");
    let doc = PdfDocument::from_bytes(certification.document.clone().into_bytes()).expect("signed file parses");
    (certification, doc)
}

fn rect_of(dict: &Dict) -> Vec<f64> {
    dict.get("Rect")
        .and_then(Object::as_array)
        .expect("rect")
        .iter()
        .filter_map(Object::as_number)
        .collect()
}

fn annotation_refs(doc: &PdfDocument, page: ObjectRef) -> Vec<ObjectRef> {
    let page = doc.load_dict(page).expect("page");
    match page.get("Annots").map(|a| doc.resolve(a)) {
        Some(Ok(Object::Array(items))) => items.iter().filter_map(Object::as_reference).collect(),
        _ => Vec::new(),
    }
}

#[test]
fn test_human_to_page_transform() {
    for height in [792.0, 842.0, 1008.0] {
        let page = signature_rect(height).to_page_rect(height);
        assert_eq!(page.to_array(), [25.0, 74.0, 145.0, 94.0], "page height {}", height);
    }
}

#[test]
fn test_transform_preserves_size() {
    let rect = Rect::new(40.0, 100.0, 200.0, 50.0);
    let page = rect.to_page_rect(792.0);
    assert_eq!(page.width(), 200.0);
    assert_eq!(page.height(), 50.0);
    assert_eq!(page.upper_right_y, 692.0);
}

#[test]
fn test_field_on_cover_page() {
    let (certification, doc) = certify(&cover_request(), common::classic_pdf(1, LETTER));
    let pages = doc.pages().expect("pages");
    assert_eq!(certification.field.page, pages[0].reference);
    assert_eq!(certification.field.rect.to_array(), [25.0, 74.0, 145.0, 94.0]);
    assert!(annotation_refs(&doc, pages[0].reference).contains(&certification.field.field));

    let field = doc.load_dict(certification.field.field).expect("field");
    assert_eq!(field.get("FT").and_then(Object::as_name), Some("Sig"));
    assert_eq!(field.get("Subtype").and_then(Object::as_name), Some("Widget"));
    assert_eq!(field.get("P").and_then(Object::as_reference), Some(pages[0].reference));
    assert_eq!(rect_of(&field), vec![25.0, 74.0, 145.0, 94.0]);
}

#[test]
fn test_field_on_first_existing_page_without_cover() {
    let source = common::classic_pdf(2, A4);
    let original_first = PdfDocument::from_bytes(source.clone()).expect("source").pages().expect("pages")[0].reference;

    let (certification, doc) = certify(&plain_request(), source);
    let pages = doc.pages().expect("pages");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].reference, original_first);
    assert_eq!(certification.field.page, original_first);
    assert!(annotation_refs(&doc, original_first).contains(&certification.field.field));
    assert_eq!(certification.field.rect.to_array(), [25.0, 74.0, 145.0, 94.0]);
}

#[test]
fn test_field_registered_in_acroform() {
    let (certification, doc) = certify(&cover_request(), common::classic_pdf(1, LETTER));
    let catalog = doc.catalog().expect("catalog");
    let form = doc.resolve(catalog.get("AcroForm").expect("acroform")).expect("resolves");
    let form = form.as_dict().expect("dict");

    assert_eq!(form.get("SigFlags").and_then(Object::as_integer), Some(3));
    let fields = doc.resolve(form.get("Fields").expect("fields")).expect("resolves");
    let fields: Vec<ObjectRef> = fields
        .as_array()
        .expect("array")
        .iter()
        .filter_map(Object::as_reference)
        .collect();
    assert_eq!(fields, vec![certification.field.field]);
}

#[test]
fn test_widget_appearance_stream() {
    let (certification, doc) = certify(&cover_request(), common::classic_pdf(1, LETTER));
    let field = doc.load_dict(certification.field.field).expect("field");
    let normal = field
        .get("AP")
        .and_then(Object::as_dict)
        .and_then(|ap| ap.get("N"))
        .and_then(Object::as_reference)
        .expect("normal appearance");

    let appearance = doc.load_object(normal).expect("appearance");
    let Object::Stream { dict, .. } = &appearance else {
        panic!("appearance should be a stream");
    };
    assert_eq!(dict.get("Subtype").and_then(Object::as_name), Some("Form"));
    assert_eq!(rect_of_bbox(dict), vec![0.0, 0.0, 120.0, 20.0]);

    let content = String::from_utf8_lossy(&appearance.decode_stream_data().expect("decodes")).into_owned();
    assert!(content.contains("(Signed by Registrar of Companies) Tj"));
}

fn rect_of_bbox(dict: &Dict) -> Vec<f64> {
    dict.get("BBox")
        .and_then(Object::as_array)
        .expect("bbox")
        .iter()
        .filter_map(Object::as_number)
        .collect()
}
