use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence write failed: {0}")]
    Persistence(String),

    #[error("Malformed persisted state: {0}")]
    MalformedPersistedState(String),

    #[error("Combined document must be a JSON object")]
    NotAnObject,

    #[error("Aggregation store lock poisoned")]
    LockPoisoned,
}
