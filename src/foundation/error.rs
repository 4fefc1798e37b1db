/// Convenience result type used across scenecanvas.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Top-level error taxonomy used by canvas APIs.
#[derive(thiserror::Error, Debug)]
pub enum CanvasError {
    /// The upstream transform produced an unsupported or invalid mapping.
    #[error("structural error: {0}")]
    Structural(String),

    /// Malformed geometry or a broken producer contract (length mismatches, stale handles).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A raster was requested before any image existed.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Rejected argument (dwell time, index, configuration value).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed animation save string.
    #[error("invalid save string: {0}")]
    InvalidSaveString(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CanvasError {
    /// Build a [`CanvasError::Structural`] value.
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    /// Build a [`CanvasError::InvariantViolation`] value.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Build a [`CanvasError::Timeout`] value.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Build a [`CanvasError::InvalidArgument`] value.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Build a [`CanvasError::InvalidSaveString`] value.
    pub fn invalid_save_string(msg: impl Into<String>) -> Self {
        Self::InvalidSaveString(msg.into())
    }

    /// Transient conditions are retried by the loops and never surfaced as user errors.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
