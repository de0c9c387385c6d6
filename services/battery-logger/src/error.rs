use thiserror::Error;

/// Failures reaching or changing a sheet.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("invalid sheet name: {0:?}")]
    InvalidSheetName(String),

    #[error("cell out of range: row {row}, column {column}")]
    CellOutOfRange { row: usize, column: usize },

    #[error("row out of range: {row}")]
    RowOutOfRange { row: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Why a submitted record was not written. Both kinds reach the device as the
/// same error envelope.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SubmitError {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::Payload(_) => "payload",
            SubmitError::Store(_) => "store",
        }
    }
}
