//! PDF writing for incremental updates.
//!
//! ## Architecture
//!
//! ```text
//! cover sheet / signature appearance
//!     ↓
//! [ContentStreamBuilder] (operators → content stream bytes)
//!     ↓
//! [IncrementalUpdate] (staged objects → appended section + xref)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! original bytes ++ update bytes
//! ```

mod content_stream;
mod image;
mod incremental;
mod object_serializer;

pub use content_stream::{encode_win_ansi, ContentStreamBuilder, ContentStreamOp};
pub use self::image::{default_stamp, ColorSpace, ImageData};
pub use incremental::{IncrementalUpdate, WrittenUpdate};
pub use object_serializer::{format_real, ObjectSerializer};
