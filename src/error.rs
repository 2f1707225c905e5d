use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<&'static str> },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Invalid matrix file: {0}")]
    Import(String),
}

pub type Result<T> = std::result::Result<T, MatrixError>;
