//! Metrics for the standard Helvetica faces.
//!
//! Widths are the Adobe AFM advance widths in 1/1000 em for the printable
//! ASCII range. Other characters fall back to an average width.

use crate::object::{Dict, Object};

/// Helvetica widths for U+0020..=U+007E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // 'a'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Helvetica-Bold widths for U+0020..=U+007E.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, // 'a'..'z'
    389, 280, 389, 584, // '{'..'~'
];

const FALLBACK_WIDTH: u16 = 556;

/// The two text styles used on generated pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextStyle {
    /// Helvetica
    Plain,
    /// Helvetica-Bold
    Bold,
}

impl TextStyle {
    /// PostScript name of the face.
    pub fn base_font(&self) -> &'static str {
        match self {
            TextStyle::Plain => "Helvetica",
            TextStyle::Bold => "Helvetica-Bold",
        }
    }

    /// Name of the font in a page's `/Font` resources.
    pub fn resource_name(&self) -> &'static str {
        match self {
            TextStyle::Plain => "F1",
            TextStyle::Bold => "F2",
        }
    }

    /// Advance width of one character in 1/1000 em.
    pub fn char_width(&self, ch: char) -> u16 {
        let table = match self {
            TextStyle::Plain => &HELVETICA_WIDTHS,
            TextStyle::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match ch {
            ' '..='~' => table[ch as usize - 0x20],
            '\u{2014}' => 1000,
            _ => FALLBACK_WIDTH,
        }
    }

    /// Width of `text` in points at `font_size`.
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f64 * font_size / 1000.0
    }

    /// Type1 font dictionary with WinAnsi encoding.
    pub fn font_dict(&self) -> Object {
        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("Font".into()));
        dict.insert("Subtype".into(), Object::Name("Type1".into()));
        dict.insert("BaseFont".into(), Object::Name(self.base_font().into()));
        dict.insert("Encoding".into(), Object::Name("WinAnsiEncoding".into()));
        Object::Dictionary(dict)
    }
}

/// `/Font` resource dictionary declaring both styles inline.
pub fn font_resources() -> Object {
    let mut fonts = Dict::new();
    for style in [TextStyle::Plain, TextStyle::Bold] {
        fonts.insert(style.resource_name().into(), style.font_dict());
    }
    Object::Dictionary(fonts)
}
