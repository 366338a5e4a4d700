use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Worth retrying later; the other variants will fail again
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unreachable(_))
    }
}
