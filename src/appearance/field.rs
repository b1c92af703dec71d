//! Signature field construction.
//!
//! The field is a merged field/widget annotation (`/FT /Sig`) listed in
//! the page's `/Annots` and in the AcroForm's `/Fields`. Its normal
//! appearance is a form XObject sized to the field rectangle.

use super::panel::{widget_content, PanelText};
use crate::cover::CoverPage;
use crate::document::{PageInfo, PdfDocument};
use crate::error::{Error, Result};
use crate::layout::{font_resources, PageRect, Rect};
use crate::object::{Dict, Object, ObjectRef};
use crate::writer::{IncrementalUpdate, ObjectSerializer};
use bytes::Bytes;

/// SignaturesExist | AppendOnly
pub const SIG_FLAGS: i64 = 3;

/// Annotation flag: print.
const PRINT_FLAG: i64 = 4;

const FIELD_X: f64 = 25.0;
const FIELD_WIDTH: f64 = 120.0;
const FIELD_HEIGHT: f64 = 20.0;
/// Distance from the page bottom to the field's top edge.
const FIELD_TOP_FROM_BOTTOM: f64 = 94.0;

/// Page that receives the signature widget.
#[derive(Debug)]
pub enum SignaturePage<'a> {
    /// The generated cover page, still under construction
    Cover(&'a mut CoverPage),
    /// An existing page of the source document
    Existing(&'a PageInfo),
}

/// The created field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureFieldHandle {
    /// Merged field/widget dictionary
    pub field: ObjectRef,
    /// Page the widget is on
    pub page: ObjectRef,
    /// Widget rectangle in page coordinates
    pub rect: PageRect,
}

/// Field rectangle in human coordinates on a page `page_height` tall.
pub fn signature_rect(page_height: f64) -> Rect {
    Rect::new(FIELD_X, page_height - FIELD_TOP_FROM_BOTTOM, FIELD_WIDTH, FIELD_HEIGHT)
}

/// Create the signature field whose value is `signature`, anchored to
/// `page`, and register it with the AcroForm.
pub fn place_signature_field(
    doc: &PdfDocument,
    update: &mut IncrementalUpdate,
    page: SignaturePage<'_>,
    signature: ObjectRef,
    text: &PanelText,
) -> Result<SignatureFieldHandle> {
    let (page_ref, page_height) = match &page {
        SignaturePage::Cover(cover) => (cover.reference, cover.height()),
        SignaturePage::Existing(info) => (info.reference, info.height()),
    };
    let rect = signature_rect(page_height).to_page_rect(page_height);

    let appearance = update.add(appearance_stream(text, &rect)?);
    let field_name = unique_field_name(doc, update)?;
    let [llx, lly, urx, ury] = rect.to_array();
    let field = update.add(ObjectSerializer::dict(vec![
        ("Type", ObjectSerializer::name("Annot")),
        ("Subtype", ObjectSerializer::name("Widget")),
        ("FT", ObjectSerializer::name("Sig")),
        ("T", ObjectSerializer::string(&field_name)),
        ("V", Object::Reference(signature)),
        ("F", Object::Integer(PRINT_FLAG)),
        ("Rect", ObjectSerializer::rect(llx, lly, urx, ury)),
        ("P", Object::Reference(page_ref)),
        (
            "AP",
            ObjectSerializer::dict(vec![("N", Object::Reference(appearance))]),
        ),
    ]));

    match page {
        SignaturePage::Cover(cover) => cover.annots.push(Object::Reference(field)),
        SignaturePage::Existing(info) => append_annotation(doc, update, info.reference, field)?,
    }
    register_field(doc, update, field)?;

    log::debug!("Placed signature field {} ({}) on page {}", field, field_name, page_ref);
    Ok(SignatureFieldHandle {
        field,
        page: page_ref,
        rect,
    })
}

fn appearance_stream(text: &PanelText, rect: &PageRect) -> Result<Object> {
    let mut resources = Dict::new();
    resources.insert("Font".into(), font_resources());

    let mut dict = Dict::new();
    dict.insert("Type".into(), Object::Name("XObject".into()));
    dict.insert("Subtype".into(), Object::Name("Form".into()));
    dict.insert("BBox".into(), ObjectSerializer::rect(0.0, 0.0, rect.width(), rect.height()));
    dict.insert("Resources".into(), Object::Dictionary(resources));

    Ok(Object::Stream {
        dict,
        data: Bytes::from(widget_content(text, rect.height())?),
    })
}

/// `Signature1`, or the next free number if other fields use that name.
fn unique_field_name(doc: &PdfDocument, update: &IncrementalUpdate) -> Result<String> {
    let mut taken = Vec::new();
    if let Some(form) = acroform(doc, update)? {
        if let Some(fields) = form.get("Fields") {
            if let Object::Array(fields) = update.resolve(doc, fields)? {
                for field in &fields {
                    let field = update.resolve(doc, field)?;
                    if let Some(name) = field.as_dict().and_then(|d| d.get("T")).and_then(|t| t.as_string()) {
                        taken.push(String::from_utf8_lossy(name).into_owned());
                    }
                }
            }
        }
    }
    Ok((1..)
        .map(|n| format!("Signature{}", n))
        .find(|name| !taken.contains(name))
        .unwrap_or_else(|| "Signature".to_string()))
}

fn acroform(doc: &PdfDocument, update: &IncrementalUpdate) -> Result<Option<Dict>> {
    let catalog = update.fetch_dict(doc, doc.root_ref()?)?;
    match catalog.get("AcroForm") {
        Some(form) => match update.resolve(doc, form)? {
            Object::Dictionary(dict) => Ok(Some(dict)),
            other => Err(Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: other.type_name().to_string(),
            }),
        },
        None => Ok(None),
    }
}

/// Add `field` to the AcroForm's `/Fields`, creating the form if needed,
/// and set `/SigFlags`. Existing fields are kept.
fn register_field(doc: &PdfDocument, update: &mut IncrementalUpdate, field: ObjectRef) -> Result<()> {
    let root = doc.root_ref()?;
    let mut catalog = update.fetch_dict(doc, root)?;
    let form_entry = catalog.get("AcroForm").cloned();
    let mut form = acroform(doc, update)?.unwrap_or_default();

    let fields_entry = form.get("Fields").cloned();
    let mut fields = match &fields_entry {
        Some(entry) => match update.resolve(doc, entry)? {
            Object::Array(fields) => fields,
            _ => Vec::new(),
        },
        None => Vec::new(),
    };
    fields.push(Object::Reference(field));
    match fields_entry {
        Some(Object::Reference(fields_ref)) => update.set(fields_ref, Object::Array(fields)),
        _ => {
            form.insert("Fields".into(), Object::Array(fields));
        },
    }
    form.insert("SigFlags".into(), Object::Integer(SIG_FLAGS));

    match form_entry {
        Some(Object::Reference(form_ref)) => update.set(form_ref, Object::Dictionary(form)),
        _ => {
            catalog.insert("AcroForm".into(), Object::Dictionary(form));
            update.set(root, Object::Dictionary(catalog));
        },
    }
    Ok(())
}

/// Append an annotation reference to an existing page's `/Annots`.
fn append_annotation(doc: &PdfDocument, update: &mut IncrementalUpdate, page: ObjectRef, annot: ObjectRef) -> Result<()> {
    let mut page_dict = update.fetch_dict(doc, page)?;
    let entry = page_dict.get("Annots").cloned();
    let mut annots = match &entry {
        Some(entry) => match update.resolve(doc, entry)? {
            Object::Array(annots) => annots,
            _ => Vec::new(),
        },
        None => Vec::new(),
    };
    annots.push(Object::Reference(annot));
    match entry {
        Some(Object::Reference(annots_ref)) => update.set(annots_ref, Object::Array(annots)),
        _ => {
            page_dict.insert("Annots".into(), Object::Array(annots));
            update.set(page, Object::Dictionary(page_dict));
        },
    }
    Ok(())
}
