//! Core contact domain types

mod field;
mod record;

pub use field::{Field, FieldKind};
pub use record::{parse_list_field, render_list_field, ContactRecord, FieldValue};
