use thiserror::Error;

/// Precondition failures raised by the descriptor engine.
///
/// None of these are transient: every variant is detected before the
/// pairwise pass starts, so a failed call never produces a partial vector.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DescriptorError {
    /// Malformed or degenerate geometry (bad angles, non-positive volume, too few atoms).
    #[error("Invalid structure: {0}")]
    Structure(String),

    #[error("Property '{property}' does not exist for element '{element}'")]
    MissingProperty { element: String, property: String },

    /// Bad engine parameters or a property name unknown to the whole table.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DescriptorError {
    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
