use thiserror::Error;

/// Errors surfaced by a [`DocumentStore`](super::DocumentStore) backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or rejected the operation
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// A stored document could not be (de)serialized
    #[error("Document {collection}/{key} is malformed: {source}")]
    Malformed {
        collection: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error, keeping connection-level failures distinct from everything else
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Type alias for document store results
pub type Result<T> = std::result::Result<T, StoreError>;
