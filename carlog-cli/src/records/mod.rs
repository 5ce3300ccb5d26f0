//! Corrective-action record model
//!
//! Canonical schema, typed field values, business keys and the pending-edit
//! patch set shared by import, manual editing and export.

mod field;
mod key;
mod patch;
mod record;
mod value;

pub use field::*;
pub use key::*;
pub use patch::*;
pub use record::*;
pub use value::*;
