use thiserror::Error;

/// Failures that end a request. Malformed parts are not in here; the
/// accumulator recovers from those on its own.
#[derive(Debug, Error)]
pub enum DocChatError {
    #[error("extraction failed for {file_name}: {cause:#}")]
    Extraction {
        file_name: String,
        cause: anyhow::Error,
    },
    #[error("generation backend failed: {0:#}")]
    Generation(anyhow::Error),
    #[error("chat store failed: {0:#}")]
    Persistence(anyhow::Error),
}

impl DocChatError {
    pub fn kind(&self) -> &'static str {
        match self {
            DocChatError::Extraction { .. } => "extraction_failed",
            DocChatError::Generation(_) => "generation_failed",
            DocChatError::Persistence(_) => "persistence_failed",
        }
    }
}

/// A single multipart part that could not be read.
#[derive(Debug, Error)]
#[error("malformed part {name:?}: {reason}")]
pub struct PartError {
    pub name: Option<String>,
    pub reason: String,
}

impl PartError {
    pub fn new(name: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            name: name.map(str::to_string),
            reason: reason.into(),
        }
    }
}
