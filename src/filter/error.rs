use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Filter is already attached to an endpoint")]
    AlreadyAttached,

    #[error("No endpoint is attached to the filter")]
    Detached,

    #[error("Attached endpoint cannot be {0}")]
    WrongDirection(&'static str),

    #[error("Stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed base64 input: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, FilterError>;
