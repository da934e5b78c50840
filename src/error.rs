use thiserror::Error;

/// Errors surfaced to the user by ledger and document operations.
///
/// None of these end the session. Ledger operations that fail leave the
/// ledger exactly as it was before the call.
#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Invalid line item: {0}")]
    Validation(String),

    #[error("No line item at index {index} (ledger holds {len})")]
    Index { index: usize, len: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Could not retrieve template from {source_name}: {reason}")]
    Fetch { source_name: String, reason: String },

    #[error("Could not render document: {0}")]
    Render(String),

    #[error("Could not write document {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl InvoiceError {
    pub fn render(reason: impl Into<String>) -> Self {
        InvoiceError::Render(reason.into())
    }

    /// Short heading for the error popup.
    pub fn title(&self) -> &'static str {
        match self {
            InvoiceError::Validation(_) => "Invalid input",
            InvoiceError::Index { .. } => "Unknown line item",
            InvoiceError::Configuration(_) => "Configuration",
            InvoiceError::Fetch { .. } => "Template download",
            InvoiceError::Render(_) => "Rendering",
            InvoiceError::Output { .. } => "Saving",
        }
    }
}

impl From<zip::result::ZipError> for InvoiceError {
    fn from(err: zip::result::ZipError) -> Self {
        InvoiceError::Render(format!("invalid docx archive: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
