use crate::Config;
use crate::batch::output_dir_for;
use crate::metadata::validate_date_format;
use crate::render::load_font;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Input directory does not exist: {0}")]
    InputDirectoryMissing(String),

    #[error("Input directory is not readable: {0}")]
    InputDirectoryUnreadable(String),

    #[error("No usable font: {0}")]
    FontMissing(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Failed to create output directory: {0}")]
    OutputDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Output directory is the input directory: {0}")]
    OutputOverlapsInput(String),
}

impl StartupCheckError {
    /// Critical failures stop the run before any file is touched.
    pub fn is_critical(&self) -> bool {
        !matches!(self, StartupCheckError::OutputDirectoryCreationFailed(_))
    }
}

pub fn perform_startup_checks(input_dir: &Path, config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    if !input_dir.is_dir() {
        error!("Input directory does not exist: {:?}", input_dir);
        errors.push(StartupCheckError::InputDirectoryMissing(
            input_dir.display().to_string(),
        ));
    } else {
        match std::fs::read_dir(input_dir) {
            Ok(_) => info!("Input directory is accessible: {:?}", input_dir),
            Err(e) => {
                error!("Input directory is not accessible: {}", e);
                errors.push(StartupCheckError::InputDirectoryUnreadable(
                    input_dir.display().to_string(),
                ));
            }
        }
    }

    match load_font(config.watermark.font.as_deref()) {
        Ok(_) => info!("Font loaded"),
        Err(e) => {
            error!("{}", e);
            errors.push(StartupCheckError::FontMissing(e.to_string()));
        }
    }

    if let Err(e) = validate_date_format(&config.watermark.date_format) {
        error!("{}", e);
        errors.push(StartupCheckError::InvalidDateFormat(
            config.watermark.date_format.clone(),
        ));
    }

    let output_dir = output_dir_for(input_dir, config);
    if crate::export::ensure_distinct_output(input_dir, &output_dir).is_err() {
        errors.push(StartupCheckError::OutputOverlapsInput(
            output_dir.display().to_string(),
        ));
    } else if input_dir.is_dir() && !output_dir.exists() {
        info!("Output directory does not exist, creating: {:?}", output_dir);
        if let Err(e) = std::fs::create_dir_all(&output_dir) {
            warn!("Failed to create output directory: {}", e);
            errors.push(StartupCheckError::OutputDirectoryCreationFailed(e));
        }
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config_with_bundled_font() -> Config {
        let mut config = Config::default();
        config.watermark.font = Some(
            Path::new(env!("CARGO_MANIFEST_DIR")).join(crate::render::BUNDLED_FONT),
        );
        config
    }

    #[test]
    fn test_checks_pass_and_create_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_with_bundled_font();
        if load_font(config.watermark.font.as_deref()).is_err() {
            return;
        }

        let result = perform_startup_checks(temp_dir.path(), &config);
        assert!(result.is_ok());
        assert!(output_dir_for(temp_dir.path(), &config).is_dir());
    }

    #[test]
    fn test_missing_input_is_critical() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let errors = perform_startup_checks(&missing, &config_with_bundled_font()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, StartupCheckError::InputDirectoryMissing(_))));
        assert!(errors.iter().any(|e| e.is_critical()));
        assert!(!missing.exists());
    }

    #[test]
    fn test_bad_date_format_and_overlapping_output() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_with_bundled_font();
        config.watermark.date_format = "%Q".to_string();
        config.export.output_directory = Some(PathBuf::from(temp_dir.path()));

        let errors = perform_startup_checks(temp_dir.path(), &config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, StartupCheckError::InvalidDateFormat(_))));
        assert!(errors
            .iter()
            .any(|e| matches!(e, StartupCheckError::OutputOverlapsInput(_))));
    }
}
