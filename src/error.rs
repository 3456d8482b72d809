use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReisError>;

/// Rejection raised by the feature encoder for a malformed request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl EncodeError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EncodeError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            EncodeError::InvalidInput { field, .. } => field,
        }
    }
}

#[derive(Error, Debug)]
pub enum ReisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Model error: {0}")]
    Model(String),
}

impl ReisError {
    /// True when the failure was caused by the caller's input rather than the process state.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ReisError::Encode(_))
    }
}
