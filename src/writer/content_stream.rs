//! PDF content stream builder.
//!
//! Builds the graphics and text operators used by the cover sheet and
//! the signature appearance (ISO 32000-1:2008 Sections 8-9).

use super::object_serializer::format_real;
use crate::error::Result;
use std::io::Write;

/// Operations that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Set transformation matrix (cm)
    Transform(f64, f64, f64, f64, f64, f64),
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font resource and size (Tf)
    SetFont(String, f64),
    /// Move text position (Td)
    MoveText(f64, f64),
    /// Set text matrix (Tm)
    SetTextMatrix(f64, f64, f64, f64, f64, f64),
    /// Show text (Tj), encoded as WinAnsi
    ShowText(String),
    /// Set fill color RGB (rg)
    SetFillColorRGB(f64, f64, f64),
    /// Set stroke color RGB (RG)
    SetStrokeColorRGB(f64, f64, f64),
    /// Set line width (w)
    SetLineWidth(f64),
    /// Move to (m)
    MoveTo(f64, f64),
    /// Line to (l)
    LineTo(f64, f64),
    /// Rectangle (re)
    Rectangle(f64, f64, f64, f64),
    /// Stroke (S)
    Stroke,
    /// Fill (f)
    Fill,
    /// Paint XObject (Do)
    PaintXObject(String),
}

/// Builder for PDF content streams.
#[derive(Debug, Clone, Default)]
pub struct ContentStreamBuilder {
    operations: Vec<ContentStreamOp>,
    current_font: Option<String>,
    current_font_size: f64,
    in_text_object: bool,
}

impl ContentStreamBuilder {
    /// Create a new content stream builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation to the stream.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Operations recorded so far.
    pub fn operations(&self) -> &[ContentStreamOp] {
        &self.operations
    }

    /// Begin a text object.
    pub fn begin_text(&mut self) -> &mut Self {
        if !self.in_text_object {
            self.op(ContentStreamOp::BeginText);
            self.in_text_object = true;
            self.current_font = None;
        }
        self
    }

    /// End a text object.
    pub fn end_text(&mut self) -> &mut Self {
        if self.in_text_object {
            self.op(ContentStreamOp::EndText);
            self.in_text_object = false;
        }
        self
    }

    /// Select a font resource; repeated selections are elided.
    pub fn set_font(&mut self, resource: &str, size: f64) -> &mut Self {
        if self.current_font.as_deref() != Some(resource) || self.current_font_size != size {
            self.op(ContentStreamOp::SetFont(resource.to_string(), size));
            self.current_font = Some(resource.to_string());
            self.current_font_size = size;
        }
        self
    }

    /// Show text with its baseline origin at `(x, y)`.
    pub fn text(&mut self, text: &str, x: f64, y: f64) -> &mut Self {
        self.begin_text();
        self.op(ContentStreamOp::SetTextMatrix(1.0, 0.0, 0.0, 1.0, x, y));
        self.op(ContentStreamOp::ShowText(text.to_string()));
        self
    }

    /// Set fill color.
    pub fn set_fill_color(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.op(ContentStreamOp::SetFillColorRGB(r, g, b))
    }

    /// Set stroke color.
    pub fn set_stroke_color(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.op(ContentStreamOp::SetStrokeColorRGB(r, g, b))
    }

    /// Set line width.
    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        self.op(ContentStreamOp::SetLineWidth(width))
    }

    /// Stroke a straight line from `(x1, y1)` to `(x2, y2)`.
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> &mut Self {
        self.op(ContentStreamOp::MoveTo(x1, y1));
        self.op(ContentStreamOp::LineTo(x2, y2));
        self.op(ContentStreamOp::Stroke)
    }

    /// Fill a rectangle.
    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.op(ContentStreamOp::Rectangle(x, y, width, height));
        self.op(ContentStreamOp::Fill)
    }

    /// Save graphics state.
    pub fn save_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::SaveState)
    }

    /// Restore graphics state.
    pub fn restore_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::RestoreState)
    }

    /// Paint an image XObject into the box at `(x, y)` sized `width` x `height`.
    pub fn draw_image(&mut self, resource: &str, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.save_state();
        self.op(ContentStreamOp::Transform(width, 0.0, 0.0, height, x, y));
        self.op(ContentStreamOp::PaintXObject(resource.to_string()));
        self.restore_state()
    }

    /// Build the content stream to bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for op in &self.operations {
            write_op(&mut buf, op)?;
            writeln!(buf)?;
        }
        Ok(buf)
    }
}

fn write_op<W: Write>(w: &mut W, op: &ContentStreamOp) -> std::io::Result<()> {
    let n = |v: &f64| format_real(*v);
    match op {
        ContentStreamOp::SaveState => write!(w, "q"),
        ContentStreamOp::RestoreState => write!(w, "Q"),
        ContentStreamOp::Transform(a, b, c, d, e, f) => {
            write!(w, "{} {} {} {} {} {} cm", n(a), n(b), n(c), n(d), n(e), n(f))
        },
        ContentStreamOp::BeginText => write!(w, "BT"),
        ContentStreamOp::EndText => write!(w, "ET"),
        ContentStreamOp::SetFont(name, size) => write!(w, "/{} {} Tf", name, n(size)),
        ContentStreamOp::MoveText(tx, ty) => write!(w, "{} {} Td", n(tx), n(ty)),
        ContentStreamOp::SetTextMatrix(a, b, c, d, e, f) => {
            write!(w, "{} {} {} {} {} {} Tm", n(a), n(b), n(c), n(d), n(e), n(f))
        },
        ContentStreamOp::ShowText(text) => {
            write!(w, "(")?;
            write_escaped(w, &encode_win_ansi(text))?;
            write!(w, ") Tj")
        },
        ContentStreamOp::SetFillColorRGB(r, g, b) => write!(w, "{} {} {} rg", n(r), n(g), n(b)),
        ContentStreamOp::SetStrokeColorRGB(r, g, b) => write!(w, "{} {} {} RG", n(r), n(g), n(b)),
        ContentStreamOp::SetLineWidth(width) => write!(w, "{} w", n(width)),
        ContentStreamOp::MoveTo(x, y) => write!(w, "{} {} m", n(x), n(y)),
        ContentStreamOp::LineTo(x, y) => write!(w, "{} {} l", n(x), n(y)),
        ContentStreamOp::Rectangle(x, y, width, height) => {
            write!(w, "{} {} {} {} re", n(x), n(y), n(width), n(height))
        },
        ContentStreamOp::Stroke => write!(w, "S"),
        ContentStreamOp::Fill => write!(w, "f"),
        ContentStreamOp::PaintXObject(name) => write!(w, "/{} Do", name),
    }
}

fn write_escaped<W: Write>(w: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    for &byte in bytes {
        match byte {
            b'(' | b')' | b'\\' => w.write_all(&[b'\\', byte])?,
            b'\n' => write!(w, "\\n")?,
            b'\r' => write!(w, "\\r")?,
            _ => w.write_all(&[byte])?,
        }
    }
    Ok(())
}

/// Encode text for a standard font with `/WinAnsiEncoding`.
///
/// Latin-1 characters map to themselves; a handful of typographic
/// characters map to their WinAnsi slots; anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
