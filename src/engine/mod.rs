//! The update-authorization and merge engine.
//!
//! `comparator` decides whether a proposed field value preserves everything
//! already persisted, `merge` builds the full field set to write, and `gate`
//! orchestrates both inside one store transaction.

mod comparator;
mod gate;
mod merge;

pub use comparator::{first_destructive_field, is_non_destructive};
pub use gate::HistoryService;
pub use merge::build_record_fields;
