use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfSpliceError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Archive build failed: {0}")]
    ArchiveError(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),
}
