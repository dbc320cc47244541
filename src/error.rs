//! Error taxonomy for the history engine.
//!
//! Client-attributable failures (bad envelope, missing role, destructive
//! update) are kept distinct from store failures so the embedding layer can
//! choose between client-error and server-error responses.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request envelope. Detected before a transaction is opened.
    #[error("invalid request: {0}")]
    ClientInput(String),

    /// Actor role missing or could not be resolved. Detected before Load.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The proposed update would remove or alter previously recorded data.
    #[error("update to '{category}' would alter previously recorded data in field '{field}'")]
    DestructiveUpdate { category: String, field: String },

    /// The subject has no identity record at all. Distinct from "no history
    /// yet", which is not an error.
    #[error("subject {subject_id} has no identity record")]
    SubjectNotFound { subject_id: Uuid },

    /// Category key not present in the schema registry. A configuration
    /// error, not a user-facing rejection.
    #[error("unknown history category '{0}'")]
    UnknownCategory(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the failure is attributable to the caller's request rather
    /// than to the engine or its backing store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ClientInput(_)
                | Error::NotAuthorized(_)
                | Error::DestructiveUpdate { .. }
                | Error::SubjectNotFound { .. }
        )
    }
}
