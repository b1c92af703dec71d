//! Shared fixtures for integration tests: generated PDFs, PKCS#12 key
//! stores and an in-memory document store.

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Name, X509};
use pdf_certifier::config::CertifierConfig;
use pdf_certifier::request::{CertificationRequest, CoverSheetData};
use pdf_certifier::storage::DocumentStore;
use pdf_certifier::{Error, Result};
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

pub const LOCATION: &str = "s3://documents/filing.pdf";
pub const ALIAS: &str = "certifier";
pub const PASSWORD: &str = "changeit";
pub const SIGNER_CN: &str = "Test Registrar";

/// US Letter.
pub const LETTER: [f64; 4] = [0.0, 0.0, 612.0, 792.0];
/// A4.
pub const A4: [f64; 4] = [0.0, 0.0, 595.0, 842.0];

fn page_objects(pages: usize, media_box: [f64; 4]) -> Vec<String> {
    page_objects_with_root(pages, media_box, "")
}

fn page_objects_with_root(pages: usize, media_box: [f64; 4], root_extra: &str) -> Vec<String> {
    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} /MediaBox [{} {} {} {}]{} >>",
            kids.join(" "),
            pages,
            media_box[0],
            media_box[1],
            media_box[2],
            media_box[3],
            root_extra
        ),
    ];
    for i in 0..pages {
        let content = format!("BT /F1 12 Tf 72 700 Td (Original page {}) Tj ET", i + 1);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /Contents {} 0 R /Resources << /Font << /F1 << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> >> >> >>",
            4 + 2 * i
        ));
        objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content));
    }
    objects
}

/// Document with a classic `xref` table; page size is inherited from the
/// page tree root.
pub fn classic_pdf(pages: usize, media_box: [f64; 4]) -> Vec<u8> {
    write_classic(&page_objects(pages, media_box))
}

/// Classic document whose page tree root carries `/Rotate rotate`.
pub fn rotated_pdf(pages: usize, media_box: [f64; 4], rotate: i64) -> Vec<u8> {
    write_classic(&page_objects_with_root(pages, media_box, &format!(" /Rotate {}", rotate)))
}

fn write_classic(objects: &[String]) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f\r\n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n\r\n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

/// Document indexed by an uncompressed cross-reference stream.
pub fn xref_stream_pdf(pages: usize, media_box: [f64; 4]) -> Vec<u8> {
    let objects = page_objects(pages, media_box);
    let mut out = b"%PDF-1.5\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_id = objects.len() + 1;
    let xref_offset = out.len();
    offsets.push(xref_offset);

    let mut entries = vec![0u8, 0, 0, 0, 0, 0xFF, 0xFF];
    for offset in &offsets {
        entries.push(1);
        entries.extend_from_slice(&(*offset as u32).to_be_bytes());
        entries.extend_from_slice(&[0, 0]);
    }
    out.extend_from_slice(
        format!(
            "{} 0 obj\n<< /Type /XRef /Size {} /W [1 4 2] /Root 1 0 R /Length {} >>\nstream\n",
            xref_id,
            xref_id + 1,
            entries.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&entries);
    out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
    out
}

/// Self-signed RSA certificate valid from `not_before` to `not_after`,
/// both in seconds relative to now.
pub fn certificate(common_name: &str, not_before: i64, not_after: i64) -> (PKey<Private>, X509) {
    let pkey = PKey::from_rsa(Rsa::generate(2048).expect("rsa")).expect("pkey");
    let mut name = X509Name::builder().expect("name");
    name.append_entry_by_text("CN", common_name).expect("cn");
    let name = name.build();

    let mut builder = X509::builder().expect("builder");
    builder.set_version(2).expect("version");
    let serial = BigNum::from_u32(4242).and_then(|n| n.to_asn1_integer()).expect("serial");
    builder.set_serial_number(&serial).expect("serial");
    builder.set_subject_name(&name).expect("subject");
    builder.set_issuer_name(&name).expect("issuer");
    builder.set_pubkey(&pkey).expect("pubkey");
    let now = chrono::Utc::now().timestamp();
    builder
        .set_not_before(&Asn1Time::from_unix(now + not_before).expect("time"))
        .expect("not before");
    builder
        .set_not_after(&Asn1Time::from_unix(now + not_after).expect("time"))
        .expect("not after");
    builder.sign(&pkey, MessageDigest::sha256()).expect("sign");
    (pkey, builder.build())
}

/// PKCS#12 file holding `cert` and its key under `alias`.
pub fn key_store_file(alias: &str, password: &str, pkey: &PKey<Private>, cert: &X509) -> NamedTempFile {
    let pkcs12 = Pkcs12::builder()
        .name(alias)
        .pkey(pkey)
        .cert(cert)
        .build2(password)
        .expect("pkcs12");
    let mut file = NamedTempFile::new().expect("tempfile");
    file.write_all(&pkcs12.to_der().expect("der")).expect("write");
    file
}

/// Key store with a certificate valid for a day either side of now.
pub fn valid_key_store() -> NamedTempFile {
    let (pkey, cert) = certificate(SIGNER_CN, -86_400, 86_400);
    key_store_file(ALIAS, PASSWORD, &pkey, &cert)
}

/// Key store with a certificate that expired yesterday.
pub fn expired_key_store() -> NamedTempFile {
    let (pkey, cert) = certificate(SIGNER_CN, -10 * 86_400, -86_400);
    key_store_file(ALIAS, PASSWORD, &pkey, &cert)
}

/// Configuration signing with the key store at `file`.
pub fn config_for(file: &NamedTempFile) -> CertifierConfig {
    CertifierConfig::new()
        .with_keystore("PKCS12", file.path(), PASSWORD)
        .with_certificate_alias(ALIAS)
        .with_status_url("https://status.example/signatures")
}

/// Complete request asking for a cover sheet.
pub fn cover_request() -> CertificationRequest {
    CertificationRequest {
        document_location: Some(LOCATION.into()),
        document_type: Some("accounts".into()),
        signature_options: Some(vec!["cover-sheet".into()]),
        prefix: Some("certified".into()),
        key: Some("filing-signed.pdf".into()),
        cover_sheet_data: Some(CoverSheetData {
            company_name: Some("Test Company Ltd".into()),
            company_number: Some("01234567".into()),
            filing_history_type: Some("AA".into()),
            filing_history_description: Some("**Full accounts** made up to {made_up_date}".into()),
        }),
        filing_history_description_values: Some(HashMap::from([(
            "made_up_date".to_string(),
            "2023-03-31".to_string(),
        )])),
    }
}

/// Complete request without a cover sheet.
pub fn plain_request() -> CertificationRequest {
    CertificationRequest {
        signature_options: Some(Vec::new()),
        cover_sheet_data: None,
        filing_history_description_values: None,
        ..cover_request()
    }
}

/// Documents held in memory, keyed by location.
#[derive(Default)]
pub struct MemoryStore {
    documents: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn with(location: &str, bytes: Vec<u8>) -> Self {
        Self {
            documents: HashMap::from([(location.to_string(), bytes)]),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn retrieve(&self, location: &str) -> Result<Vec<u8>> {
        self.documents.get(location).cloned().ok_or_else(|| Error::Storage {
            status: 404,
            message: format!("No such key: {}", location),
        })
    }
}

/// Length of the DER value at the start of `bytes`, header included.
pub fn der_len(bytes: &[u8]) -> usize {
    match bytes.get(1).copied() {
        Some(len) if len < 0x80 => 2 + len as usize,
        Some(len) => {
            let count = (len & 0x7F) as usize;
            let body = bytes[2..2 + count].iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
            2 + count + body
        },
        None => 0,
    }
}
