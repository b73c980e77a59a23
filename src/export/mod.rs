// Output side of the pipeline: where files go, what they are called, how they are encoded
pub mod formats;
pub mod naming;
pub mod resize;

pub use formats::OutputFormat;
pub use naming::{ConflictPolicy, NamingConfig, NamingRule, OutputPlanner};
pub use resize::ResizeMode;

use crate::error::{Result, WatermarkError};
use std::path::{Path, PathBuf};

/// Default output directory: `<input>/<input name>_watermark`.
pub fn derive_output_dir(input_dir: &Path) -> PathBuf {
    let canonical = input_dir
        .canonicalize()
        .unwrap_or_else(|_| input_dir.to_path_buf());
    let name = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "images".to_string());

    input_dir.join(format!("{}_watermark", name))
}

/// Reject an output directory that is the input directory itself.
pub fn ensure_distinct_output(input_dir: &Path, output_dir: &Path) -> Result<()> {
    if same_location(input_dir, output_dir) {
        return Err(WatermarkError::OutputOverlapsInput(output_dir.to_path_buf()));
    }
    Ok(())
}

/// Reject a target path that points at the source file.
pub fn ensure_not_source(source: &Path, target: &Path) -> Result<()> {
    if same_location(source, target) {
        return Err(WatermarkError::WouldOverwriteSource(source.to_path_buf()));
    }
    Ok(())
}

fn same_location(a: &Path, b: &Path) -> bool {
    absolute(a) == absolute(b)
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
