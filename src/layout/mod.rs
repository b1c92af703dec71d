//! Layout primitives: font metrics, coordinate transforms and wrapping.
//!
//! Everything here is a pure function of its inputs.

pub mod fonts;
pub mod geometry;
pub mod wrap;

pub use fonts::{font_resources, TextStyle};
pub use geometry::{PageRect, Rect};
pub use wrap::{normalize_whitespace, wrap, wrap_spans, DESCRIPTION_WRAP_WIDTH};
