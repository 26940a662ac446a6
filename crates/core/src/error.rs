/// Result alias that carries the custom [`ExplorerError`] type.
pub type Result<T> = std::result::Result<T, ExplorerError>;

/// Common error type for the core crate.
///
/// Only loading (dataset or configuration) surfaces errors to callers.
/// Navigation, image and playback failures are absorbed by the component that
/// owns them and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    /// Free-form message, mostly used for poisoned shared state.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// JSON that could not be deserialized into the expected shape.
    #[error("malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// Well-formed JSON that breaks a dataset rule (duplicate ids and the like).
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
}

impl ExplorerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn dataset<T: Into<String>>(msg: T) -> Self {
        Self::InvalidDataset(msg.into())
    }

    /// True for errors caused by the content of a dataset or config file
    /// rather than by the environment.
    pub fn is_content_error(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::InvalidDataset(_))
    }
}

impl From<&str> for ExplorerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ExplorerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
