use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use datemark::{
    Config, batch,
    export::{ConflictPolicy, NamingRule, OutputFormat, ResizeMode},
    layout::{Anchor, Placement},
    metadata::resolve_timestamp,
    render::TextColor,
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "datemark.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stamp every image in a directory with its capture date
    Apply {
        /// Directory containing the images
        input_dir: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show the timestamp that would be used for a file or directory
    Inspect {
        path: PathBuf,

        /// Override the date pattern from the config
        #[arg(long)]
        date_format: Option<String>,
    },
}

/// Per-run overrides for values in the config file
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Output directory (default: <input>/<input name>_watermark)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Font file (TTF/OTF)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Font size in pixels (default: scaled to the image)
    #[arg(long)]
    font_size: Option<f32>,

    /// Text color: a name, #RRGGBB, #RGB or "auto"
    #[arg(long)]
    color: Option<TextColor>,

    /// 0 (invisible) to 255 (opaque)
    #[arg(long)]
    opacity: Option<u8>,

    /// Degrees counter-clockwise
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<f32>,

    #[arg(long, value_enum)]
    position: Option<Anchor>,

    /// Distance from the image edge in pixels
    #[arg(long)]
    margin: Option<u32>,

    /// Draw the drop shadow
    #[arg(long, conflicts_with = "no_shadow")]
    shadow: bool,

    /// Disable the drop shadow
    #[arg(long)]
    no_shadow: bool,

    #[arg(long, allow_hyphen_values = true)]
    shadow_offset_x: Option<i32>,

    #[arg(long, allow_hyphen_values = true)]
    shadow_offset_y: Option<i32>,

    /// Shadow color; "auto" contrasts with the text
    #[arg(long)]
    shadow_color: Option<TextColor>,

    #[arg(long)]
    shadow_opacity: Option<u8>,

    #[arg(long)]
    stroke_width: Option<u32>,

    /// Outline color; "auto" contrasts with the text
    #[arg(long)]
    stroke_color: Option<TextColor>,

    /// strftime pattern for the stamp, e.g. "%Y-%m-%d %H:%M"
    #[arg(long)]
    date_format: Option<String>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// JPEG quality, 1-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Scale by a percentage before stamping
    #[arg(long, conflicts_with_all = ["resize_width", "resize_height"])]
    resize_percent: Option<f32>,

    /// Target width; with --resize-height both are exact
    #[arg(long)]
    resize_width: Option<u32>,

    /// Target height; with --resize-width both are exact
    #[arg(long)]
    resize_height: Option<u32>,

    /// Ignore any resize from the config file
    #[arg(long, conflicts_with_all = ["resize_percent", "resize_width", "resize_height"])]
    no_resize: bool,

    #[arg(long, value_enum)]
    naming: Option<NamingRule>,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    suffix: Option<String>,

    #[arg(long, value_enum)]
    on_conflict: Option<ConflictPolicy>,

    /// Process files one at a time
    #[arg(long)]
    sequential: bool,

    #[arg(long)]
    threads: Option<usize>,
}

impl Overrides {
    fn resize_mode(&self) -> Option<ResizeMode> {
        match (self.resize_percent, self.resize_width, self.resize_height) {
            (Some(percent), _, _) => Some(ResizeMode::Percent { percent }),
            (None, Some(width), Some(height)) => Some(ResizeMode::Exact { width, height }),
            (None, Some(width), None) => Some(ResizeMode::Width { width }),
            (None, None, Some(height)) => Some(ResizeMode::Height { height }),
            (None, None, None) => None,
        }
    }

    fn apply_to(self, config: &mut Config) {
        if self.no_resize {
            config.export.resize = None;
        } else if let Some(mode) = self.resize_mode() {
            config.export.resize = Some(mode);
        }

        let watermark = &mut config.watermark;
        if let Some(font) = self.font {
            watermark.font = Some(font);
        }
        if let Some(date_format) = self.date_format {
            watermark.date_format = date_format;
        }
        if self.font_size.is_some() {
            watermark.style.font_size = self.font_size;
        }
        if let Some(color) = self.color {
            watermark.style.color = color;
        }
        if let Some(opacity) = self.opacity {
            watermark.style.opacity = opacity;
        }
        if let Some(rotation) = self.rotation {
            watermark.style.rotation = rotation;
        }
        if let Some(position) = self.position {
            watermark.style.position = Placement::Anchor(position);
        }
        if let Some(margin) = self.margin {
            watermark.style.margin = margin;
        }
        if self.shadow {
            watermark.style.shadow = true;
        }
        if self.no_shadow {
            watermark.style.shadow = false;
        }
        let shadow = &mut watermark.style.shadow_style;
        if let Some(offset_x) = self.shadow_offset_x {
            shadow.offset_x = offset_x;
        }
        if let Some(offset_y) = self.shadow_offset_y {
            shadow.offset_y = offset_y;
        }
        if let Some(color) = self.shadow_color {
            shadow.color = color;
        }
        if self.shadow_opacity.is_some() {
            shadow.opacity = self.shadow_opacity;
        }
        if let Some(stroke_width) = self.stroke_width {
            watermark.style.stroke_width = stroke_width;
        }
        if let Some(stroke_color) = self.stroke_color {
            watermark.style.stroke_color = stroke_color;
        }

        let export = &mut config.export;
        if let Some(output) = self.output {
            export.output_directory = Some(output);
        }
        if let Some(format) = self.format {
            export.format = format;
        }
        if let Some(quality) = self.quality {
            export.jpeg_quality = quality;
        }
        if let Some(rule) = self.naming {
            export.naming.rule = rule;
        }
        if let Some(prefix) = self.prefix {
            export.naming.prefix = prefix;
        }
        if let Some(suffix) = self.suffix {
            export.naming.suffix = suffix;
        }
        if let Some(policy) = self.on_conflict {
            export.naming.on_conflict = policy;
        }

        if self.sequential {
            config.batch.parallel = false;
        }
        if self.threads.is_some() {
            config.batch.threads = self.threads;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Apply {
            input_dir,
            overrides,
        } => {
            overrides.apply_to(&mut config);
            run_apply(&input_dir, &config)
        }
        Commands::Inspect { path, date_format } => {
            if let Some(date_format) = date_format {
                config.watermark.date_format = date_format;
            }
            run_inspect(&path, &config)
        }
    }
}

fn run_apply(input_dir: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Configuration: {:?}", config);

    if let Err(errors) = startup_checks::perform_startup_checks(input_dir, config) {
        for error in &errors {
            tracing::error!("Startup check failed: {}", error);
        }
        if errors.iter().any(|e| e.is_critical()) {
            tracing::error!("Critical startup check failed, exiting");
            return Err("Critical startup check failed".into());
        }
        tracing::warn!("Non-critical startup checks failed, continuing");
    }

    let report = batch::run_batch(input_dir, config)?;

    println!();
    println!("Processing complete!");
    println!(
        "Processed: {} images ({} from EXIF, {} from file time)",
        report.processed.len(),
        report.exif_count(),
        report.mtime_count()
    );
    println!("Skipped: {} images", report.skipped.len());
    println!("Failed: {} images", report.failed.len());
    for failure in &report.failed {
        println!("  {}: {}", failure.source.display(), failure.error);
    }
    println!("Output directory: {}", report.output_dir.display());

    if !report.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_inspect(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let files = if path.is_dir() {
        batch::collect_images(path, config)?
    } else {
        vec![path.to_path_buf()]
    };

    for file in files {
        match resolve_timestamp(&file) {
            Ok(stamp) => println!(
                "{}\t{}\t{}",
                file.display(),
                stamp.format(&config.watermark.date_format)?,
                stamp.source
            ),
            Err(e) => eprintln!("{}\terror: {}", file.display(), e),
        }
    }

    Ok(())
}
