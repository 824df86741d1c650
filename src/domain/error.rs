use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Invalid YouTube URL or video ID")]
    InvalidInput,

    #[error("API error: {0}")]
    Api(String),

    #[error("No audio stream available for this video")]
    NoAudioStream,

    #[error("Stream title is empty once sanitized")]
    EmptyTitle,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NoDownloadUrl => AppError::NoAudioStream,
            other => AppError::Api(other.to_string()),
        }
    }
}
