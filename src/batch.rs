use crate::Config;
use crate::error::{Result, WatermarkError};
use crate::export::{self, OutputPlanner, formats, resize};
use crate::metadata::{CaptureTimestamp, TimestampSource, resolve_timestamp};
use crate::render::{load_font, render_watermark};
use ab_glyph::FontVec;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub source: PathBuf,
    pub output: PathBuf,
    pub timestamp: CaptureTimestamp,
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub source: PathBuf,
    pub existing_output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FailedFile {
    pub source: PathBuf,
    pub error: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub output_dir: PathBuf,
    pub processed: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedFile>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.failed.len()
    }

    /// Processed files whose stamp came from EXIF.
    pub fn exif_count(&self) -> usize {
        self.processed
            .iter()
            .filter(|p| p.timestamp.source.is_exif())
            .count()
    }

    /// Processed files stamped with their modification time.
    pub fn mtime_count(&self) -> usize {
        self.processed
            .iter()
            .filter(|p| p.timestamp.source == TimestampSource::FileModified)
            .count()
    }
}

struct Job {
    source: PathBuf,
    target: PathBuf,
}

/// Supported images directly inside `dir`, sorted by name.
pub fn collect_images(dir: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(WatermarkError::InvalidInputDirectory(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1) // Only immediate children
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_file() && config.batch.is_supported(path) {
            images.push(path.to_path_buf());
        }
    }

    Ok(images)
}

/// Output directory for `input_dir` under `config`.
pub fn output_dir_for(input_dir: &Path, config: &Config) -> PathBuf {
    config
        .export
        .output_directory
        .clone()
        .unwrap_or_else(|| export::derive_output_dir(input_dir))
}

/// Stamp every supported image in `input_dir`.
///
/// Per-file failures are recorded in the report; only setup problems (bad
/// input directory, no font, output directory unusable) return `Err`.
pub fn run_batch(input_dir: &Path, config: &Config) -> Result<BatchReport> {
    let start_time = Instant::now();

    let sources = collect_images(input_dir, config)?;
    let output_dir = output_dir_for(input_dir, config);
    export::ensure_distinct_output(input_dir, &output_dir)?;

    let font = load_font(config.watermark.font.as_deref())?;
    std::fs::create_dir_all(&output_dir)?;

    info!(
        "Found {} images in {}, writing to {}",
        sources.len(),
        input_dir.display(),
        output_dir.display()
    );

    let mut planner = OutputPlanner::new();
    let mut jobs = Vec::with_capacity(sources.len());
    let mut skipped = Vec::new();

    for source in sources {
        let extension = config.export.format.extension(&source);
        let candidate = output_dir.join(config.export.naming.file_name(&source, &extension));
        match planner.claim(candidate.clone(), config.export.naming.on_conflict) {
            Some(target) => jobs.push(Job { source, target }),
            None => {
                info!("Output exists, skipping {}", source.display());
                skipped.push(SkippedFile {
                    source,
                    existing_output: candidate,
                });
            }
        }
    }

    let outcomes: Vec<(Job, Result<CaptureTimestamp>)> = if config.batch.parallel {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = config.batch.threads {
            builder = builder.num_threads(threads.max(1));
        }
        let pool = builder.build()?;
        debug!("Processing with {} worker threads", pool.current_num_threads());

        pool.install(|| {
            jobs.into_par_iter()
                .map(|job| {
                    let result = watermark_file(&job.source, &job.target, config, &font);
                    (job, result)
                })
                .collect()
        })
    } else {
        jobs.into_iter()
            .map(|job| {
                let result = watermark_file(&job.source, &job.target, config, &font);
                (job, result)
            })
            .collect()
    };

    let mut processed = Vec::new();
    let mut failed = Vec::new();
    for (job, result) in outcomes {
        match result {
            Ok(timestamp) => processed.push(ProcessedFile {
                source: job.source,
                output: job.target,
                timestamp,
            }),
            Err(e) => {
                error!("Failed to watermark {}: {}", job.source.display(), e);
                failed.push(FailedFile {
                    source: job.source,
                    error: e.to_string(),
                });
            }
        }
    }

    let report = BatchReport {
        output_dir,
        processed,
        skipped,
        failed,
        elapsed: start_time.elapsed(),
    };

    info!(
        "Batch completed: {} processed ({} EXIF, {} mtime), {} skipped, {} failed in {:.2}s",
        report.processed.len(),
        report.exif_count(),
        report.mtime_count(),
        report.skipped.len(),
        report.failed.len(),
        report.elapsed.as_secs_f64()
    );

    Ok(report)
}

/// Run the whole pipeline for one file: resolve date, load, resize, render, write.
pub fn watermark_file(
    source: &Path,
    target: &Path,
    config: &Config,
    font: &FontVec,
) -> Result<CaptureTimestamp> {
    export::ensure_not_source(source, target)?;

    let timestamp = resolve_timestamp(source)?;
    let text = timestamp.format(&config.watermark.date_format)?;
    let format = config.export.format.image_format(source)?;

    let image = image::ImageReader::open(source)?
        .with_guessed_format()?
        .decode()?;
    let image = match &config.export.resize {
        Some(mode) => resize::resize(image, mode),
        None => image,
    };

    let stamped = render_watermark(&image, &text, &config.watermark.style, font);
    formats::save(&stamped, target, format, config.export.jpeg_quality)?;

    info!(
        "Watermarked {} -> {} with \"{}\" ({})",
        source.display(),
        target.display(),
        text,
        timestamp.source
    );

    Ok(timestamp)
}
