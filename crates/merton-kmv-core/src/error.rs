use thiserror::Error;

#[derive(Debug, Error)]
pub enum MertonKmvError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MertonKmvError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        MertonKmvError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MertonKmvError {
    fn from(e: serde_json::Error) -> Self {
        MertonKmvError::SerializationError(e.to_string())
    }
}
