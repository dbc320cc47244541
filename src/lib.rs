//! # Anamnese
//!
//! Update-authorization and merge engine for category-based clinical history
//! records.
//!
//! A patient's history is split into independently-updatable categories
//! (allergic, family, gyneco-obstetric, ...), each persisted as a
//! semi-structured record keyed by subject identity. Clinicians may rewrite
//! any field; subjects may only add information. The engine decides, per
//! field, whether a proposed update is a non-destructive superset of the
//! persisted data, fills in category defaults for omitted fields, and applies
//! accepted updates atomically.
//!
//! **No API concerns**: identity resolution, HTTP servers and rendering
//! belong to the embedding application. This crate owns the registry, the
//! comparator, the merge builder, the authorization gate and the
//! transactional store contract, and nothing else.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod registry;

pub use engine::HistoryService;
pub use error::{Error, Result};
