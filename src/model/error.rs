use thiserror::Error;

/// Errors raised by the encoder core.
///
/// All of these are fatal: a construction error means the configuration can
/// never produce a working model, and a forward-time error means the caller
/// handed over tensors inconsistent with the configured dimensions. Nothing
/// here is retryable.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("Forward pass error: {0}")]
    ForwardError(String),
}
