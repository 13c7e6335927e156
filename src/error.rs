use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillError {
    #[error("Missing required sheets: {missing:?}. Available sheets: {available:?}")]
    MissingSheets {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Unreadable workbook {name}: {reason}")]
    UnreadableWorkbook { name: String, reason: String },

    #[error("Invalid rate for {name}: {value} (must be between 0.0 and 1.0)")]
    InvalidRate { name: String, value: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Batch rejected: {0}")]
    Admission(String),

    #[error("Template {template} failed to render: {reason}")]
    Render { template: String, reason: String },

    #[error("Document production failed for {document}: {reason}")]
    Document { document: String, reason: String },

    #[error("Could not combine documents: {0}")]
    Packaging(String),

    #[error("Consistency violation in {field}: expected {expected}, found {actual}")]
    ConsistencyViolation {
        field: String,
        expected: f64,
        actual: f64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BillError {
    /// True for failures that reject a single input file before any report is built.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BillError::MissingSheets { .. }
                | BillError::EmptyInput(_)
                | BillError::UnreadableWorkbook { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BillError>;
