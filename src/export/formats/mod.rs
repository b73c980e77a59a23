pub mod jpeg;
pub mod png;

use crate::error::{Result, WatermarkError};
use clap::ValueEnum;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Same format as the source file
    #[default]
    Keep,
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Concrete encoder format for a given source file.
    pub fn image_format(&self, source: &Path) -> Result<ImageFormat> {
        match self {
            OutputFormat::Jpeg => Ok(ImageFormat::Jpeg),
            OutputFormat::Png => Ok(ImageFormat::Png),
            OutputFormat::Keep => ImageFormat::from_path(source)
                .map_err(|_| WatermarkError::UnsupportedFormat(source.to_path_buf())),
        }
    }

    /// File extension for outputs derived from `source`.
    pub fn extension(&self, source: &Path) -> String {
        match self {
            OutputFormat::Jpeg => "jpg".to_string(),
            OutputFormat::Png => "png".to_string(),
            OutputFormat::Keep => source
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Encode `image` to `path` as `format`.
pub fn save(image: &DynamicImage, path: &Path, format: ImageFormat, jpeg_quality: u8) -> Result<()> {
    match format {
        ImageFormat::Jpeg => jpeg::save(image, path, jpeg_quality),
        ImageFormat::Png => png::save(image, path),
        other => {
            image.save_with_format(path, other)?;
            Ok(())
        }
    }
}
