//! Error types for Collage

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollageError>;

#[derive(Error, Debug)]
pub enum CollageError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Save error: {0}")]
    Save(#[from] SaveError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CollageError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CollageError::InvalidInput(_) => 3,
            CollageError::Save(e) => e.kind().exit_code(),
            CollageError::Config(_) => 1,
            CollageError::Image(_) => 1,
            CollageError::Io(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failure of a single persistence attempt
///
/// The display text is what the user sees in the error prompt.
#[derive(Error, Debug)]
pub enum SaveError {
    /// The library call completed but produced no identifier
    #[error("Could not save photo")]
    CouldNotSave,

    /// The library call itself failed
    #[error("Failed to save photo: {0}")]
    Underlying(#[from] LibraryError),
}

impl SaveError {
    pub fn kind(&self) -> SaveErrorKind {
        match self {
            SaveError::CouldNotSave => SaveErrorKind::CouldNotSave,
            SaveError::Underlying(_) => SaveErrorKind::Underlying,
        }
    }
}

/// Which [`SaveError`] variant occurred, without its payload
///
/// Travels in screen events so listeners can map a failure to an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveErrorKind {
    CouldNotSave,
    Underlying,
}

impl SaveErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            SaveErrorKind::CouldNotSave => 2,
            SaveErrorKind::Underlying => 1,
        }
    }
}

/// Errors raised by a photo library backend
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Photo library unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// The modal went away without the user acknowledging it
    #[error("Prompt closed without acknowledgement")]
    Abandoned,
}
