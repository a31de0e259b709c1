use crate::event::Temp;
use thiserror::Error;

/// Errors raised by shelf storage operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShelfError {
    #[error("invalid temperature: {0:?}")]
    InvalidTemp(Temp),
    #[error("order not found")]
    NotFound,
}

/// Errors raised while computing an order's freshness value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    #[error("residency was never shelved")]
    NeverShelved,
    #[error("overflow placement is after primary placement")]
    InvalidResidencyOrder,
}

/// Fatal bootstrap errors. Everything else is recovered in-task and reported as a `Diag`.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to read orders file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse orders file {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
