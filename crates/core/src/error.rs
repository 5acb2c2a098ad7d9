use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("{0}")]
    Other(String),
}
