use thiserror::Error;

#[derive(Error, Debug)]
pub enum MuniError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Unknown fund type: {0}")]
    UnknownFund(String),

    #[error("Budget period not found: {0}")]
    PeriodNotFound(i64),

    #[error("Import already running")]
    ImportBusy,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MuniError>;
