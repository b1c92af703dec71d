//! Cover page composition.
//!
//! The cover page is a new page object staged in an [`IncrementalUpdate`]
//! and inserted as the first kid of the root page tree node. Its content
//! stream stays open in [`CoverPage`] so the signature panel can be drawn
//! onto it before the page is finished.

use super::description::FilingDescription;
use crate::document::{PdfDocument, DEFAULT_MEDIA_BOX};
use crate::error::{Error, Result};
use crate::layout::{font_resources, normalize_whitespace, wrap_spans, TextStyle, DESCRIPTION_WRAP_WIDTH};
use crate::object::{Dict, Object, ObjectRef};
use crate::request::CoverSheetData;
use crate::writer::{ContentStreamBuilder, IncrementalUpdate};
use bytes::Bytes;
use std::collections::HashMap;

/// Left margin of all cover page text.
pub const LEFT_MARGIN: f64 = 50.0;

const AUTHORITY_SIZE: f64 = 16.0;
const TITLE_SIZE: f64 = 14.0;
const BODY_SIZE: f64 = 11.0;
const DESCRIPTION_SIZE: f64 = 12.0;

/// Distances from the top of the page to each baseline of the static block.
const AUTHORITY_OFFSET: f64 = 80.0;
const TITLE_OFFSET: f64 = 120.0;
const STATEMENT_OFFSETS: [f64; 2] = [148.0, 163.0];
const COMPANY_NAME_OFFSET: f64 = 200.0;
const COMPANY_NUMBER_OFFSET: f64 = 218.0;
const DESCRIPTION_OFFSET: f64 = 260.0;

const TITLE: &str = "CERTIFIED COPY";
const STATEMENT: [&str; 2] = [
    "This is a certified copy of a document delivered to and",
    "held on the public register by the issuing authority.",
];

/// A cover page under construction.
#[derive(Debug, Clone)]
pub struct CoverPage {
    /// Object number reserved for the page dictionary
    pub reference: ObjectRef,
    /// Root page tree node the page was inserted under
    pub parent: ObjectRef,
    /// `[0 0 width height]`
    pub media_box: [f64; 4],
    /// Page content drawn so far
    pub content: ContentStreamBuilder,
    /// `/XObject` resources used by `content`
    pub xobjects: Dict,
    /// Annotations to list in the page's `/Annots`
    pub annots: Vec<Object>,
}

impl CoverPage {
    /// Page width.
    pub fn width(&self) -> f64 {
        self.media_box[2]
    }

    /// Page height.
    pub fn height(&self) -> f64 {
        self.media_box[3]
    }

    /// Stage the content stream and the page dictionary.
    pub fn finish(self, update: &mut IncrementalUpdate) -> Result<ObjectRef> {
        let mut stream_dict = Dict::new();
        stream_dict.insert("Filter".into(), Object::Name("FlateDecode".into()));
        let content = crate::decoders::flate_encode(&self.content.build()?)?;
        let contents = update.add(Object::Stream {
            dict: stream_dict,
            data: Bytes::from(content),
        });

        let mut resources = Dict::new();
        resources.insert("Font".into(), font_resources());
        if !self.xobjects.is_empty() {
            resources.insert("XObject".into(), Object::Dictionary(self.xobjects));
        }

        let mut page = Dict::new();
        page.insert("Type".into(), Object::Name("Page".into()));
        page.insert("Parent".into(), Object::Reference(self.parent));
        page.insert(
            "MediaBox".into(),
            Object::Array(self.media_box.iter().map(|v| Object::Real(*v)).collect()),
        );
        page.insert("Rotate".into(), Object::Integer(0));
        page.insert("Resources".into(), Object::Dictionary(resources));
        page.insert("Contents".into(), Object::Reference(contents));
        if !self.annots.is_empty() {
            page.insert("Annots".into(), Object::Array(self.annots));
        }
        update.set(self.reference, Object::Dictionary(page));
        Ok(self.reference)
    }
}

/// Pen position and active style while laying out mixed-style lines.
#[derive(Debug, Clone, Copy)]
struct Pen {
    x: f64,
    y: f64,
    style: TextStyle,
}

impl Pen {
    fn draw(&mut self, content: &mut ContentStreamBuilder, style: TextStyle, text: &str, size: f64) {
        if text.is_empty() {
            return;
        }
        self.style = style;
        content.set_font(self.style.resource_name(), size);
        content.text(text, self.x, self.y);
        self.x += style.text_width(text, size);
    }

    fn new_line(&mut self, leading: f64) {
        self.x = LEFT_MARGIN;
        self.y -= leading;
    }
}

/// Build the cover page and insert it as page 0.
///
/// Any failure is reported as [`Error::CoverSheet`]; nothing staged by a
/// failed call should be written.
pub fn compose(
    doc: &PdfDocument,
    update: &mut IncrementalUpdate,
    data: &CoverSheetData,
    values: &HashMap<String, String>,
    authority_name: &str,
) -> Result<CoverPage> {
    compose_inner(doc, update, data, values, authority_name).map_err(Error::cover_sheet)
}

fn compose_inner(
    doc: &PdfDocument,
    update: &mut IncrementalUpdate,
    data: &CoverSheetData,
    values: &HashMap<String, String>,
    authority_name: &str,
) -> Result<CoverPage> {
    let (company_name, company_number, filing_type, raw_description) = data.required_fields()?;
    let composed = FilingDescription::parse(raw_description).compose(filing_type, values)?;

    let media_box = cover_media_box(doc)?;
    let height = media_box[3];
    let mut content = ContentStreamBuilder::new();
    content.begin_text();

    let baseline = |offset: f64| height - offset;
    content
        .set_font(TextStyle::Bold.resource_name(), AUTHORITY_SIZE)
        .text(authority_name, LEFT_MARGIN, baseline(AUTHORITY_OFFSET))
        .set_font(TextStyle::Bold.resource_name(), TITLE_SIZE)
        .text(TITLE, LEFT_MARGIN, baseline(TITLE_OFFSET))
        .set_font(TextStyle::Plain.resource_name(), BODY_SIZE);
    for (line, offset) in STATEMENT.iter().zip(STATEMENT_OFFSETS) {
        content.text(line, LEFT_MARGIN, baseline(offset));
    }

    for (label, value, offset) in [
        ("Company name: ", company_name, COMPANY_NAME_OFFSET),
        ("Company number: ", company_number, COMPANY_NUMBER_OFFSET),
    ] {
        let mut pen = Pen {
            x: LEFT_MARGIN,
            y: baseline(offset),
            style: TextStyle::Plain,
        };
        pen.draw(&mut content, TextStyle::Bold, label, BODY_SIZE);
        pen.draw(&mut content, TextStyle::Plain, normalize_whitespace(value).trim(), BODY_SIZE);
    }

    let mut pen = Pen {
        x: LEFT_MARGIN,
        y: baseline(DESCRIPTION_OFFSET),
        style: TextStyle::Bold,
    };
    let lines = wrap_spans(&composed.text, DESCRIPTION_WRAP_WIDTH);
    for (i, span) in lines.iter().enumerate() {
        if i > 0 {
            pen.new_line(DESCRIPTION_SIZE);
        }
        let bold_start = composed.bold.start.clamp(span.start, span.end);
        let bold_end = composed.bold.end.clamp(span.start, span.end);
        pen.draw(&mut content, TextStyle::Plain, &composed.text[span.start..bold_start], DESCRIPTION_SIZE);
        pen.draw(&mut content, TextStyle::Bold, &composed.text[bold_start..bold_end], DESCRIPTION_SIZE);
        pen.draw(&mut content, TextStyle::Plain, &composed.text[bold_end..span.end], DESCRIPTION_SIZE);
    }
    content.end_text();

    let reference = update.allocate();
    let parent = insert_first_page(doc, update, reference)?;
    log::debug!(
        "Composed cover page {} ({} description lines, {}x{})",
        reference,
        lines.len(),
        media_box[2],
        media_box[3]
    );

    Ok(CoverPage {
        reference,
        parent,
        media_box,
        content,
        xobjects: Dict::new(),
        annots: Vec::new(),
    })
}

/// Size of the first page, moved to the origin; A4 for a document
/// without pages.
fn cover_media_box(doc: &PdfDocument) -> Result<[f64; 4]> {
    let first = doc.pages()?.into_iter().next();
    let (width, height) = match first {
        Some(page) => (page.width(), page.height()),
        None => (DEFAULT_MEDIA_BOX[2], DEFAULT_MEDIA_BOX[3]),
    };
    Ok([0.0, 0.0, width, height])
}

/// Make `page` the first kid of the root `/Pages` node and bump `/Count`.
fn insert_first_page(doc: &PdfDocument, update: &mut IncrementalUpdate, page: ObjectRef) -> Result<ObjectRef> {
    let root = doc.pages_root()?;
    let mut pages = update.fetch_dict(doc, root)?;

    let kids_entry = pages.get("Kids").cloned().unwrap_or(Object::Array(Vec::new()));
    let mut kids = match update.resolve(doc, &kids_entry)? {
        Object::Array(kids) => kids,
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Array".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };
    kids.insert(0, Object::Reference(page));
    match kids_entry {
        Object::Reference(kids_ref) => update.set(kids_ref, Object::Array(kids)),
        _ => {
            pages.insert("Kids".into(), Object::Array(kids));
        },
    }

    let count = match pages.get("Count") {
        Some(count) => update.resolve(doc, count)?.as_integer().unwrap_or(0),
        None => 0,
    };
    pages.insert("Count".into(), Object::Integer(count + 1));
    update.set(root, Object::Dictionary(pages));
    Ok(root)
}
