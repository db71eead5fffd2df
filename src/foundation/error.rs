/// Convenience result type used across veir.
pub type VeirResult<T> = Result<T, VeirError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum VeirError {
    /// Invalid user-provided project data or request parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// Data-integrity problem rejected by a strict compile.
    #[error("compile error: {0}")]
    Compile(String),

    /// A single time-stretch request failed inside the codec.
    #[error("stretch error: {0}")]
    Stretch(String),

    /// The background stretch context is gone; every in-flight request fails with this.
    #[error("transport error: {0}")]
    Transport(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VeirError {
    /// Build a [`VeirError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`VeirError::Compile`] value.
    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    /// Build a [`VeirError::Stretch`] value.
    pub fn stretch(msg: impl Into<String>) -> Self {
        Self::Stretch(msg.into())
    }

    /// Build a [`VeirError::Transport`] value.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Build a [`VeirError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for failures that take down every pending stretch request, not just one.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
