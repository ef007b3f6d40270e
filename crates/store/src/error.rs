use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate record ID: {0}")]
    DuplicateId(String),

    #[error("conditional update rejected for {id}: {reason}")]
    Conflict { id: String, reason: String },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Conflicts are the only store failures worth an automatic retry
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
