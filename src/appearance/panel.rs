//! Visual signature panel drawn at the foot of the cover page.

use crate::cover::{CoverPage, LEFT_MARGIN};
use crate::error::Result;
use crate::layout::TextStyle;
use crate::object::{Dict, Object};
use crate::writer::{ContentStreamBuilder, ImageData, IncrementalUpdate, ObjectSerializer};
use chrono::{DateTime, Utc};

/// Baselines and rules, measured up from the page bottom.
const UPPER_RULE_Y: f64 = 200.0;
const LOWER_RULE_Y: f64 = 30.0;
const TITLE_Y: f64 = 175.0;
const BODY_Y: [f64; 3] = [157.0, 143.0, 129.0];
const LINK_Y: f64 = 111.0;
const STAMP_Y: f64 = 100.0;

/// Gap between the link baseline and the top of its underline.
const UNDERLINE_OFFSET: f64 = 2.0;
const UNDERLINE_THICKNESS: f64 = 0.6;
const RULE_WIDTH: f64 = 0.75;

const TITLE_SIZE: f64 = 14.0;
const BODY_SIZE: f64 = 9.0;

/// Factor applied to the stamp's pixel size to get its size in points.
pub const STAMP_SCALE: f64 = 0.9;

const STAMP_RESOURCE: &str = "Im1";
const LINK_COLOR: (f64, f64, f64) = (0.0, 0.2, 0.6);

/// Text shown in the panel.
#[derive(Debug, Clone)]
pub struct PanelText {
    /// Heading in the larger font
    pub title: String,
    /// Name of the signing authority
    pub authority: String,
    /// Time the document is signed
    pub signed_at: DateTime<Utc>,
    /// Text of the status-check line
    pub link_text: String,
    /// Target of the status-check line
    pub status_url: Option<String>,
}

impl PanelText {
    /// Panel text with the default title and link wording.
    pub fn new(authority: impl Into<String>, signed_at: DateTime<Utc>, status_url: Option<String>) -> Self {
        Self {
            title: "Digital signature".to_string(),
            authority: authority.into(),
            signed_at,
            link_text: "Check the signature status online".to_string(),
            status_url,
        }
    }

    /// Body lines under the title.
    pub fn body_lines(&self) -> [String; 3] {
        [
            "This document has been digitally signed.".to_string(),
            format!("By: {}", self.authority),
            format!("On: {}", format_signing_time(&self.signed_at)),
        ]
    }
}

/// `18 October 2026 at 14:05:09 UTC`
pub fn format_signing_time(at: &DateTime<Utc>) -> String {
    at.format("%-d %B %Y at %H:%M:%S UTC").to_string()
}

/// Draw the panel onto the cover page and register the stamp image and
/// the status link.
pub fn render_panel(
    cover: &mut CoverPage,
    update: &mut IncrementalUpdate,
    stamp: &ImageData,
    text: &PanelText,
) -> Result<()> {
    let width = cover.width();
    let content = &mut cover.content;

    content
        .save_state()
        .set_line_width(RULE_WIDTH)
        .set_stroke_color(0.0, 0.0, 0.0)
        .line(LEFT_MARGIN, UPPER_RULE_Y, width - LEFT_MARGIN, UPPER_RULE_Y)
        .line(LEFT_MARGIN, LOWER_RULE_Y, width - LEFT_MARGIN, LOWER_RULE_Y)
        .restore_state();

    let stamp_width = stamp.width as f64 * STAMP_SCALE;
    let stamp_height = stamp.height as f64 * STAMP_SCALE;
    content.draw_image(
        STAMP_RESOURCE,
        width - LEFT_MARGIN - stamp_width,
        STAMP_Y,
        stamp_width,
        stamp_height,
    );

    content
        .begin_text()
        .set_font(TextStyle::Bold.resource_name(), TITLE_SIZE)
        .text(&text.title, LEFT_MARGIN, TITLE_Y)
        .set_font(TextStyle::Plain.resource_name(), BODY_SIZE);
    for (line, y) in text.body_lines().iter().zip(BODY_Y) {
        content.text(line, LEFT_MARGIN, y);
    }

    let (r, g, b) = LINK_COLOR;
    let link_width = TextStyle::Plain.text_width(&text.link_text, BODY_SIZE);
    content
        .set_fill_color(r, g, b)
        .text(&text.link_text, LEFT_MARGIN, LINK_Y)
        .end_text()
        .fill_rect(
            LEFT_MARGIN,
            LINK_Y - UNDERLINE_OFFSET - UNDERLINE_THICKNESS,
            link_width,
            UNDERLINE_THICKNESS,
        )
        .set_fill_color(0.0, 0.0, 0.0);

    let mask = stamp.soft_mask_xobject().map(|m| update.add(m));
    let image = update.add(stamp.xobject(mask));
    cover.xobjects.insert(STAMP_RESOURCE.into(), Object::Reference(image));

    if let Some(url) = &text.status_url {
        let link = link_annotation(
            url,
            [LEFT_MARGIN, LINK_Y - UNDERLINE_OFFSET - UNDERLINE_THICKNESS, LEFT_MARGIN + link_width, LINK_Y + BODY_SIZE],
        );
        cover.annots.push(Object::Reference(update.add(link)));
    }

    log::debug!("Rendered signature panel on cover page {}", cover.reference);
    Ok(())
}

/// `/Link` annotation opening `url`.
fn link_annotation(url: &str, rect: [f64; 4]) -> Object {
    let action: Dict = ObjectSerializer::dict_map(vec![
        ("S", ObjectSerializer::name("URI")),
        ("URI", ObjectSerializer::string(url)),
    ]);
    ObjectSerializer::dict(vec![
        ("Type", ObjectSerializer::name("Annot")),
        ("Subtype", ObjectSerializer::name("Link")),
        ("Rect", ObjectSerializer::rect(rect[0], rect[1], rect[2], rect[3])),
        (
            "Border",
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
        ),
        ("A", Object::Dictionary(action)),
    ])
}

/// Compact panel text for the signature widget's own appearance.
pub fn widget_content(text: &PanelText, height: f64) -> Result<Vec<u8>> {
    let size = (height * 0.35).min(7.0);
    let mut content = ContentStreamBuilder::new();
    content
        .begin_text()
        .set_font(TextStyle::Bold.resource_name(), size)
        .text(&format!("Signed by {}", text.authority), 2.0, height * 0.55)
        .set_font(TextStyle::Plain.resource_name(), size)
        .text(&format_signing_time(&text.signed_at), 2.0, height * 0.15)
        .end_text();
    content.build()
}
