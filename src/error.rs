use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParcelError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Barcode {0} has already been processed")]
    DuplicateIdentifier(String),
    #[error("No barcode found in image")]
    DecoderFailure,
    #[error("Storage error: {0}")]
    StorageFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ParcelError {
    /// Wraps a backend-specific message as a storage failure.
    pub fn storage(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::StorageFailure(message.into())
    }
}

impl From<rusqlite::Error> for ParcelError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageFailure(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for ParcelError {
    fn from(err: rocksdb::Error) -> Self {
        Self::StorageFailure(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ParcelError>;
