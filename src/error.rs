/// Domain-specific error types for the negotiation core.
#[derive(Debug, thiserror::Error)]
pub enum BazaarError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// One resource was written but a dependent write failed, leaving the
    /// two out of step. Distinct from total failure so callers can decide
    /// how to reconcile.
    #[error("Partial write: {0}")]
    PartialWrite(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience type alias.
pub type BazaarResult<T> = Result<T, BazaarError>;
