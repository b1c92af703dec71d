//! Visual signature: the panel on the cover page and the signature field
//! whose appearance shows it.

pub mod field;
pub mod panel;

pub use field::{place_signature_field, signature_rect, SignatureFieldHandle, SignaturePage, SIG_FLAGS};
pub use panel::{format_signing_time, render_panel, PanelText, STAMP_SCALE};
