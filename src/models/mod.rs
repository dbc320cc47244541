//! Data model: typed wrappers around semi-structured history payloads and
//! the request/response envelopes exchanged with the embedding layer.

mod envelope;
mod record;

pub use envelope::{ActorRole, UpdateEnvelope, UpdateOutcome};
pub use record::{FieldValue, Record};
