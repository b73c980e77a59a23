use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod batch;
pub mod error;
pub mod export;
pub mod layout;
pub mod metadata;
pub mod render;
pub mod startup_checks;

pub use error::{Result, WatermarkError};

use export::{NamingConfig, OutputFormat, ResizeMode};
use render::TextStyle;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub watermark: WatermarkConfig,
    pub export: ExportConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// TrueType/OpenType font; falls back to the bundled and system fonts
    pub font: Option<PathBuf>,
    /// strftime-style pattern for the stamped text
    pub date_format: String,
    #[serde(flatten)]
    pub style: TextStyle,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Defaults to `<input>/<input name>_watermark`
    pub output_directory: Option<PathBuf>,
    pub format: OutputFormat,
    pub jpeg_quality: u8,
    pub naming: NamingConfig,
    pub resize: Option<ResizeMode>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub parallel: bool,
    /// Worker count for parallel runs; all cores when unset
    pub threads: Option<usize>,
    /// Lowercase extensions, without the dot
    pub extensions: Vec<String>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            font: None,
            date_format: "%Y-%m-%d".to_string(),
            style: TextStyle::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_directory: None,
            format: OutputFormat::default(),
            jpeg_quality: 95,
            naming: NamingConfig::default(),
            resize: None,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            extensions: ["jpg", "jpeg", "png", "tif", "tiff", "bmp", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl BatchConfig {
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml_edit::de::from_str::<Config>(content)?)
    }

    /// Load `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }
}
