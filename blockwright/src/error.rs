use thiserror::Error;

pub type BlockResult<T> = Result<T, BlockError>;

#[derive(Error, Debug)]
pub enum BlockError {
    #[error("Missing required field '{field}'")]
    MissingRequired { field: String },

    #[error("Invalid timestamp '{value}' for field '{field}'")]
    InvalidTimestamp { field: String, value: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unknown block type '{name}'")]
    UnknownBlock { name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlockError {
    /// Terminal validation failures are rendered in place of the block.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BlockError::MissingRequired { .. } | BlockError::InvalidTimestamp { .. }
        )
    }
}

impl From<serde_yaml::Error> for BlockError {
    fn from(err: serde_yaml::Error) -> Self {
        BlockError::Config(err.to_string())
    }
}
