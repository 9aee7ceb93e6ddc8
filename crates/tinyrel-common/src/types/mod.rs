//! Identifier types shared across the TinyRel crates.

mod ids;
mod rid;

pub use ids::{FileId, PageNo, SlotNo};
pub use rid::Rid;
