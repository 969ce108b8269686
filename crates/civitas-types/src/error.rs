use thiserror::Error;

#[derive(Error, Debug)]
pub enum CivitasError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Credential construction error: {0}")]
    Construction(String),

    #[error("Prover key fetch error: {0}")]
    KeyFetch(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Witness encryption failed: {0}")]
    EncryptionFailed(Box<CivitasError>),

    #[error("Malformed encrypted witness: {0}")]
    MalformedWitness(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Credential expired at {0}")]
    Expired(chrono::DateTime<chrono::Utc>),
}

impl CivitasError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Wraps any failure of the witness sealing pipeline so callers see one
    /// retryable error kind. Already-wrapped errors are not nested twice.
    pub fn encryption_failed(inner: CivitasError) -> Self {
        match inner {
            already @ Self::EncryptionFailed(_) => already,
            other => Self::EncryptionFailed(Box::new(other)),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::KeyFetch(_) | Self::Network(_) | Self::EncryptionFailed(_)
        )
    }
}

pub type CivitasResult<T> = Result<T, CivitasError>;
