use thiserror::Error;

/// Errors that can occur while producing report output.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Render error: {0}")]
    Render(String),
}

impl ReportError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }
}
