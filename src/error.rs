use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("length mismatch for '{field}': expected {expected}, found {found}")]
    LengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("no type engine registered for data kind '{0}'")]
    UnknownKind(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidFormat(msg.into())
    }

    pub fn missing(field: impl Into<String>) -> Self {
        EngineError::MissingField(field.into())
    }
}

impl From<String> for EngineError {
    fn from(err: String) -> Self {
        EngineError::InvalidFormat(err)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
