use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml_edit::de::Error),

    #[error("No usable font found (tried {0:?})")]
    FontUnavailable(Vec<PathBuf>),

    #[error("Input directory does not exist or is not a directory: {0}")]
    InvalidInputDirectory(PathBuf),

    #[error("Output directory must differ from the input directory: {0}")]
    OutputOverlapsInput(PathBuf),

    #[error("Refusing to overwrite source file: {0}")]
    WouldOverwriteSource(PathBuf),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Unsupported output extension for {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
