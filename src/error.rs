use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeakerError {
    /// Source kind not recognized, or it cannot be turned into a block sequence
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Both the primary and the fallback decoder rejected the input
    #[error("Unable to decode audio (primary: {primary}; fallback: {fallback})")]
    Decode { primary: String, fallback: String },

    #[error("Failed to fetch {location}: {reason}")]
    Fetch { location: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output channel error: {0}")]
    Output(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, SpeakerError>;

impl SpeakerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SpeakerError::InvalidParameter(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        SpeakerError::UnsupportedSource(msg.into())
    }

    pub(crate) fn fetch(location: impl Into<String>, reason: impl ToString) -> Self {
        SpeakerError::Fetch {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}
