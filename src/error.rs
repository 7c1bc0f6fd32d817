//! Error types for talk

use std::io;
use thiserror::Error;

/// Main error type for talk
#[derive(Error, Debug)]
pub enum TalkError {
    /// No usable native speech facility was found while initializing
    #[error("Speech engine unavailable: {0}")]
    EngineUnavailable(String),

    /// An individual utterance failed to synthesize
    #[error("Speech output error ({platform}): {message}")]
    SynthesisFailed { platform: String, message: String },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl TalkError {
    /// Wrap an external process failure for the given platform
    pub fn synthesis(platform: impl ToString, message: impl ToString) -> Self {
        TalkError::SynthesisFailed {
            platform: platform.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for talk operations
pub type Result<T> = std::result::Result<T, TalkError>;

impl From<String> for TalkError {
    fn from(s: String) -> Self {
        TalkError::Other(s)
    }
}

impl From<&str> for TalkError {
    fn from(s: &str) -> Self {
        TalkError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for TalkError {
    fn from(e: serde_json::Error) -> Self {
        TalkError::Other(format!("JSON error: {}", e))
    }
}
