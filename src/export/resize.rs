use image::{DynamicImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Optional resize applied before the watermark is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ResizeMode {
    Percent { percent: f32 },
    /// Fixed width, height follows the aspect ratio
    Width { width: u32 },
    /// Fixed height, width follows the aspect ratio
    Height { height: u32 },
    Exact { width: u32, height: u32 },
}

impl ResizeMode {
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let (new_width, new_height) = match *self {
            ResizeMode::Percent { percent } => {
                let factor = percent.max(0.0) / 100.0;
                (
                    (width as f32 * factor) as u32,
                    (height as f32 * factor) as u32,
                )
            }
            ResizeMode::Width { width: target } => (
                target,
                (target as u64 * height as u64 / width.max(1) as u64) as u32,
            ),
            ResizeMode::Height { height: target } => (
                (target as u64 * width as u64 / height.max(1) as u64) as u32,
                target,
            ),
            ResizeMode::Exact { width, height } => (width, height),
        };

        (new_width.max(1), new_height.max(1))
    }
}

pub fn resize(image: DynamicImage, mode: &ResizeMode) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let (new_width, new_height) = mode.target_size(width, height);

    if (new_width, new_height) == (width, height) {
        return image;
    }

    debug!(
        "Resizing {}x{} -> {}x{}",
        width, height, new_width, new_height
    );
    image.resize_exact(new_width, new_height, FilterType::Lanczos3)
}
