use datemark::batch::run_batch;
use datemark::export::{ConflictPolicy, NamingRule, OutputFormat, ResizeMode};
use datemark::{Config, WatermarkError};
use image::{GenericImageView, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn bundled_font() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("static/DejaVuSans.ttf")
}

/// Helper to create a test configuration using the bundled font
fn create_test_config() -> Option<Config> {
    let font = bundled_font();
    if !font.exists() {
        eprintln!("Bundled font missing, skipping test");
        return None;
    }

    let mut config = Config::default();
    config.watermark.font = Some(font);
    Some(config)
}

/// Helper to create an input directory with a PNG, a JPEG and a non-image file
fn create_input_dir(temp_dir: &TempDir) -> PathBuf {
    let input = temp_dir.path().join("shoot");
    std::fs::create_dir_all(&input).unwrap();

    RgbImage::from_pixel(240, 160, Rgb([20, 40, 80]))
        .save(input.join("a.png"))
        .unwrap();
    RgbImage::from_pixel(240, 160, Rgb([20, 40, 80]))
        .save(input.join("b.jpg"))
        .unwrap();
    std::fs::write(input.join("notes.txt"), b"not an image").unwrap();

    input
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_batch_writes_to_derived_directory() {
    let Some(config) = create_test_config() else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let input = create_input_dir(&temp_dir);
    let png_before = std::fs::read(input.join("a.png")).unwrap();
    let jpg_before = std::fs::read(input.join("b.jpg")).unwrap();

    let report = run_batch(&input, &config).unwrap();

    assert_eq!(report.output_dir, input.join("shoot_watermark"));
    assert_eq!(report.processed.len(), 2);
    assert!(report.skipped.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.mtime_count(), 2);
    assert_eq!(file_names(&report.output_dir), vec!["a.png", "b.jpg"]);

    // Inputs are untouched
    assert_eq!(std::fs::read(input.join("a.png")).unwrap(), png_before);
    assert_eq!(std::fs::read(input.join("b.jpg")).unwrap(), jpg_before);

    // The stamp actually changed some pixels, and dimensions are preserved
    let original = image::open(input.join("a.png")).unwrap().to_rgb8();
    let stamped = image::open(report.output_dir.join("a.png")).unwrap();
    assert_eq!(stamped.dimensions(), (240, 160));
    assert_ne!(stamped.to_rgb8(), original);
}

#[test]
fn test_rerun_does_not_ingest_output_directory() {
    let Some(config) = create_test_config() else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let input = create_input_dir(&temp_dir);

    let first = run_batch(&input, &config).unwrap();
    let first_png = std::fs::read(first.output_dir.join("a.png")).unwrap();

    let second = run_batch(&input, &config).unwrap();
    assert_eq!(second.processed.len(), 2);
    assert_eq!(file_names(&second.output_dir), vec!["a.png", "b.jpg"]);
    assert_eq!(
        std::fs::read(second.output_dir.join("a.png")).unwrap(),
        first_png
    );
}

#[test]
fn test_skip_policy_leaves_existing_outputs() {
    let Some(mut config) = create_test_config() else {
        return;
    };
    config.export.naming.on_conflict = ConflictPolicy::Skip;
    let temp_dir = TempDir::new().unwrap();
    let input = create_input_dir(&temp_dir);

    run_batch(&input, &config).unwrap();
    let report = run_batch(&input, &config).unwrap();

    assert!(report.processed.is_empty());
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(
        report.skipped[0].existing_output,
        report.output_dir.join("a.png")
    );
}

#[test]
fn test_rename_policy_numbers_new_outputs() {
    let Some(mut config) = create_test_config() else {
        return;
    };
    config.export.naming.on_conflict = ConflictPolicy::Rename;
    let temp_dir = TempDir::new().unwrap();
    let input = create_input_dir(&temp_dir);

    run_batch(&input, &config).unwrap();
    let report = run_batch(&input, &config).unwrap();

    assert_eq!(report.processed.len(), 2);
    assert_eq!(
        file_names(&report.output_dir),
        vec!["a.png", "a_1.png", "b.jpg", "b_1.jpg"]
    );
}

#[test]
fn test_corrupt_file_fails_without_aborting() {
    let Some(config) = create_test_config() else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let input = create_input_dir(&temp_dir);
    std::fs::write(input.join("broken.jpg"), b"definitely not a jpeg").unwrap();

    let report = run_batch(&input, &config).unwrap();

    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].source, input.join("broken.jpg"));
    assert_eq!(report.total(), 3);
    assert!(!report.output_dir.join("broken.jpg").exists());
}

#[test]
fn test_sequential_and_parallel_agree() {
    let Some(mut config) = create_test_config() else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let input = create_input_dir(&temp_dir);

    config.batch.parallel = false;
    config.export.output_directory = Some(temp_dir.path().join("sequential"));
    let sequential = run_batch(&input, &config).unwrap();

    config.batch.parallel = true;
    config.batch.threads = Some(2);
    config.export.output_directory = Some(temp_dir.path().join("parallel"));
    let parallel = run_batch(&input, &config).unwrap();

    assert_eq!(sequential.processed.len(), parallel.processed.len());
    assert_eq!(
        std::fs::read(sequential.output_dir.join("a.png")).unwrap(),
        std::fs::read(parallel.output_dir.join("a.png")).unwrap()
    );
}

#[test]
fn test_format_naming_and_resize() {
    let Some(mut config) = create_test_config() else {
        return;
    };
    config.export.format = OutputFormat::Jpeg;
    config.export.naming.rule = NamingRule::Prefix;
    config.export.resize = Some(ResizeMode::Percent { percent: 50.0 });
    let temp_dir = TempDir::new().unwrap();
    let input = create_input_dir(&temp_dir);

    let report = run_batch(&input, &config).unwrap();

    assert_eq!(file_names(&report.output_dir), vec!["wm_a.jpg", "wm_b.jpg"]);
    let resized = image::open(report.output_dir.join("wm_a.jpg")).unwrap();
    assert_eq!(resized.dimensions(), (120, 80));
}

#[test]
fn test_output_directory_equal_to_input_is_rejected() {
    let Some(mut config) = create_test_config() else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let input = create_input_dir(&temp_dir);
    config.export.output_directory = Some(input.clone());
    let before = file_names(&input);

    let result = run_batch(&input, &config);

    assert!(matches!(result, Err(WatermarkError::OutputOverlapsInput(_))));
    assert_eq!(file_names(&input), before);
}

#[test]
fn test_empty_directory_produces_empty_report() {
    let Some(config) = create_test_config() else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("empty");
    std::fs::create_dir_all(&input).unwrap();

    let report = run_batch(&input, &config).unwrap();

    assert_eq!(report.total(), 0);
    assert!(report.output_dir.is_dir());
}

#[test]
fn test_overwrite_reruns_with_colliding_names_are_stable() {
    let Some(mut config) = create_test_config() else {
        return;
    };
    config.export.format = OutputFormat::Jpeg;
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("pair");
    std::fs::create_dir_all(&input).unwrap();
    RgbImage::from_pixel(120, 80, Rgb([20, 40, 80]))
        .save(input.join("a.png"))
        .unwrap();
    RgbImage::from_pixel(120, 80, Rgb([80, 40, 20]))
        .save(input.join("a.jpg"))
        .unwrap();

    for _ in 0..3 {
        let report = run_batch(&input, &config).unwrap();
        assert_eq!(report.processed.len(), 2);
        assert_eq!(file_names(&report.output_dir), vec!["a.jpg", "a_1.jpg"]);
    }
}
