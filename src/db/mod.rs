//! Record store implementations.
//!
//! `traits` defines the transactional boundary contract the gate runs
//! against; `postgres` is the production implementation, `memory` the
//! in-process one for deterministic tests and embedded use.

mod memory;
mod postgres;
mod traits;

pub use memory::{InMemoryRecordStore, MemoryRecordTransaction};
pub use postgres::{PgRecordTransaction, PostgresRecordStore};
pub use traits::{RecordStore, RecordTransaction};
