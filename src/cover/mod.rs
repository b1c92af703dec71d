//! Cover sheet composition.
//!
//! The cover sheet is a generated first page carrying the certification
//! statement, the company identifiers and the filing-history description
//! with its bold head.

pub mod composer;
pub mod description;

pub use composer::{compose, CoverPage, LEFT_MARGIN};
pub use description::{long_date, substitute_placeholders, ComposedDescription, FilingDescription};
