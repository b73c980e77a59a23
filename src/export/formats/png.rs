use image::{DynamicImage, codecs::png::PngEncoder};
use std::io::BufWriter;
use std::path::Path;

use crate::error::Result;

/// Save image as PNG
pub fn save(image: &DynamicImage, path: &Path) -> Result<()> {
    let output = BufWriter::new(std::fs::File::create(path)?);
    let encoder = PngEncoder::new(output);
    image.write_with_encoder(encoder)?;
    Ok(())
}
