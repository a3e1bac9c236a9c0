//! Error types for the export registry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to register metric: {0}")]
    Register(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encode(String),
}
