//! Error types for pidscope-eye

use pidscope_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EyeError {
    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<EyeError> for CoreError {
    fn from(err: EyeError) -> Self {
        match err {
            EyeError::Core(inner) => inner,
            EyeError::Io(inner) => CoreError::Io(inner),
            EyeError::Config(msg) => CoreError::Configuration(msg),
            other => CoreError::Serialization(format!("Eye error: {}", other)),
        }
    }
}
