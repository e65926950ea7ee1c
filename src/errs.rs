use thiserror::Error;

pub type SqResult<T> = Result<T, SqError>;

#[derive(Error, Debug)]
pub enum SqError {
    #[error("malformed pore model, {0}")]
    MalformedModel(String),
    #[error("malformed reference, {0}")]
    MalformedReference(String),
    #[error("malformed signal record, {0}")]
    MalformedRecord(String),
    #[error("read {0} has zero variance in its query window")]
    DegenerateWindow(String),
    #[error("io error, {0}")]
    Io(#[from] std::io::Error),
}
