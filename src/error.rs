use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubgenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid video path: {0}")]
    InvalidPath(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Audio extraction failed: {0}")]
    Extraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation provider error: {0}")]
    TranslationProvider(String),

    #[error("Subtitle formatting failed: {0}")]
    Formatting(String),

    #[error("Task cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),
}

impl SubgenError {
    /// Errors that end a task's pipeline and are recorded on the task.
    pub fn is_fatal_stage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath(_)
                | Self::Extraction(_)
                | Self::Transcription(_)
                | Self::Formatting(_)
                | Self::Cancelled
                | Self::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SubgenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_errors_are_not_fatal() {
        assert!(!SubgenError::TranslationProvider("timeout".into()).is_fatal_stage_error());
        assert!(SubgenError::Extraction("no audio stream".into()).is_fatal_stage_error());
        assert!(SubgenError::Cancelled.is_fatal_stage_error());
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = SubgenError::InvalidPath("missing.mp4".into());
        assert_eq!(err.to_string(), "Invalid video path: missing.mp4");
    }
}
