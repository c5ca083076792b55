mod common;

use common::{engine_with, write_source, FakeTools, FixedProbe, MarkerConverter};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use upscale_pipeline::adapters::Backend;
use upscale_pipeline::core::normalizer::DenoiseInput;
use upscale_pipeline::{
    OutputOutcome, RawRequest, Resolution, ToolConfig, UpscaleEngine, UpscaleError,
};

fn entries(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn request(dir: &TempDir, source: &str) -> RawRequest {
    RawRequest {
        source: dir.path().join(source).to_str().unwrap().to_string(),
        destination: dir.path().join("out.png").to_str().unwrap().to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_factor_one_on_foreign_format_only_converts() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "in.bmp");

    let probe = FixedProbe::new(1920, 1080, "bmp");
    let converter = Arc::new(MarkerConverter::default());
    let tools = FakeTools::new("");
    let engine = engine_with(probe.clone(), converter.clone(), tools.clone());

    let mut raw = request(&dir, "in.bmp");
    raw.scale = 1;
    let outcome = engine.run(&raw).await.unwrap();

    assert_eq!(outcome, OutputOutcome::ConvertedOnly(Resolution::new(1920, 1080)));
    assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
    assert!(tools.upscaler_calls().is_empty());
    assert_eq!(
        std::fs::read(dir.path().join("out.png")).unwrap(),
        b"converted"
    );
}

#[tokio::test]
async fn test_target_width_picks_power_of_two() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "in.png");

    let probe = FixedProbe::new(640, 480, "png");
    let converter = Arc::new(MarkerConverter::default());
    let tools = FakeTools::new("");
    let engine = engine_with(probe, converter.clone(), tools.clone());

    let mut raw = request(&dir, "in.png");
    raw.target_width = 1280;
    let outcome = engine.run(&raw).await.unwrap();

    assert_eq!(outcome, OutputOutcome::Upscaled(Resolution::new(1280, 960)));
    assert_eq!(converter.calls.load(Ordering::SeqCst), 0);

    let calls = tools.upscaler_calls();
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    let s = args.iter().position(|a| a == "-s").unwrap();
    assert_eq!(args[s + 1], "2");
    assert!(!args.contains(&"-n".to_string()));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("out.png")).unwrap(),
        "upscaled x2"
    );
}

#[tokio::test]
async fn test_conflicting_request_touches_nothing() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "in.png");

    let probe = FixedProbe::new(640, 480, "png");
    let tools = FakeTools::new("");
    let engine = engine_with(
        probe.clone(),
        Arc::new(MarkerConverter::default()),
        tools.clone(),
    );

    let mut raw = request(&dir, "in.png");
    raw.scale = 2;
    raw.target_width = 1280;
    let err = engine.run(&raw).await.unwrap_err();

    assert!(matches!(err, UpscaleError::InvalidArgument { .. }));
    assert_eq!(probe.calls(), 0);
    assert!(tools.recorded().is_empty());
    assert!(!dir.path().join("out.png").exists());
}

#[tokio::test]
async fn test_missing_source_is_invalid_argument() {
    let dir = TempDir::new().unwrap();
    let probe = FixedProbe::new(640, 480, "png");
    let engine = engine_with(
        probe.clone(),
        Arc::new(MarkerConverter::default()),
        FakeTools::new(""),
    );

    let err = engine.run(&request(&dir, "missing.png")).await.unwrap_err();
    assert!(matches!(err, UpscaleError::InvalidArgument { ref field, .. } if field == "source"));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn test_failed_upscale_removes_converted_destination() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "in.bmp");

    let converter = Arc::new(MarkerConverter::default());
    let engine = engine_with(
        FixedProbe::new(100, 50, "bmp"),
        converter.clone(),
        FakeTools::failing(""),
    );

    let mut raw = request(&dir, "in.bmp");
    raw.scale = 2;
    let err = engine.run(&raw).await.unwrap_err();

    match err {
        UpscaleError::UpscaleFailure { message } => assert!(message.contains("out of GPU memory")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(entries(&dir), ["in.bmp"]);
}

#[tokio::test]
async fn test_failed_upscale_keeps_existing_destination() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "in.jpg");
    std::fs::write(dir.path().join("out.png"), b"previous run").unwrap();

    let engine = engine_with(
        FixedProbe::new(100, 50, "jpeg"),
        Arc::new(MarkerConverter::default()),
        FakeTools::failing(""),
    );

    let mut raw = request(&dir, "in.jpg");
    raw.scale = 2;
    assert!(engine.run(&raw).await.is_err());
    assert_eq!(
        std::fs::read(dir.path().join("out.png")).unwrap(),
        b"previous run"
    );
    assert_eq!(entries(&dir), ["in.jpg", "out.png"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_rerun_over_linked_destination_keeps_source() {
    let dir = TempDir::new().unwrap();
    let source = write_source(dir.path(), "in.png");

    let engine = engine_with(
        FixedProbe::new(64, 32, "png"),
        Arc::new(MarkerConverter::default()),
        FakeTools::new(""),
    );

    let linked = engine.run(&request(&dir, "in.png")).await.unwrap();
    assert_eq!(linked, OutputOutcome::Symlinked(Resolution::new(64, 32)));

    let mut raw = request(&dir, "in.png");
    raw.scale = 2;
    let upscaled = engine.run(&raw).await.unwrap();

    assert_eq!(upscaled, OutputOutcome::Upscaled(Resolution::new(128, 64)));
    assert_eq!(std::fs::read(&source).unwrap(), b"source bytes");
    let destination = dir.path().join("out.png");
    assert!(!std::fs::symlink_metadata(&destination)
        .unwrap()
        .file_type()
        .is_symlink());
    assert_eq!(std::fs::read_to_string(destination).unwrap(), "upscaled x2");
}

#[tokio::test]
async fn test_deadline_stops_upscaler() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "in.png");

    let tools = FakeTools::slow("", Duration::from_secs(5));
    let engine = engine_with(
        FixedProbe::new(100, 50, "png"),
        Arc::new(MarkerConverter::default()),
        tools.clone(),
    );

    let mut raw = request(&dir, "in.png");
    raw.scale = 2;
    raw.timeout_seconds = Some(0.05);
    let err = engine.run(&raw).await.unwrap_err();

    assert!(matches!(err, UpscaleError::UpscaleTimeout { .. }));
    assert_eq!(tools.upscaler_calls().len(), 1);
    assert_eq!(entries(&dir), ["in.png"]);
}

#[tokio::test]
async fn test_denoise_level_reaches_upscaler() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "in.webp");

    let tools = FakeTools::new("");
    let engine = engine_with(
        FixedProbe::new(100, 50, "webp"),
        Arc::new(MarkerConverter::default()),
        tools.clone(),
    );

    let mut raw = request(&dir, "in.webp");
    raw.denoise = Some(DenoiseInput::Level(7));
    let outcome = engine.run(&raw).await.unwrap();

    // Denoise alone forces a pass through the upscaler at scale 1.
    assert_eq!(outcome, OutputOutcome::Upscaled(Resolution::new(100, 50)));
    let args = &tools.upscaler_calls()[0];
    let n = args.iter().position(|a| a == "-n").unwrap();
    assert_eq!(args[n + 1], "3");
}

#[cfg(unix)]
#[tokio::test]
async fn test_unscaled_png_is_linked() {
    let dir = TempDir::new().unwrap();
    let source = write_source(dir.path(), "in.png");

    let tools = FakeTools::new("");
    let converter = Arc::new(MarkerConverter::default());
    let engine = engine_with(FixedProbe::new(64, 32, "png"), converter.clone(), tools.clone());

    let outcome = engine.run(&request(&dir, "in.png")).await.unwrap();

    assert_eq!(outcome, OutputOutcome::Symlinked(Resolution::new(64, 32)));
    let link = std::fs::read_link(dir.path().join("out.png")).unwrap();
    assert_eq!(link, std::fs::canonicalize(source).unwrap());
    assert!(tools.recorded().is_empty());
    assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_magick_backends_through_engine() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "in.bmp");

    let tools = FakeTools::new("100 50 BMP");
    let config = ToolConfig {
        probe: Backend::Magick,
        converter: Backend::Magick,
        magick: Some(vec!["magick".to_string()]),
        ..Default::default()
    };
    let engine = UpscaleEngine::with_runner(&config, tools.clone()).unwrap();

    let mut raw = request(&dir, "in.bmp");
    raw.target_width = 250;
    raw.target_height = 80;
    raw.fill = true;
    let outcome = engine.run(&raw).await.unwrap();

    assert_eq!(outcome, OutputOutcome::Upscaled(Resolution::new(400, 200)));

    let recorded = tools.recorded();
    assert_eq!(recorded.len(), 3, "{:?}", recorded);
    assert!(recorded[0].ends_with("info:"));
    assert!(recorded[1].contains("png:"));

    assert!(recorded[1].starts_with("magick "));
    assert!(recorded[1].contains("in.bmp[0] png:"));

    let destination = dir.path().join("out.png");
    let args = &tools.upscaler_calls()[0];
    let i = args.iter().position(|a| a == "-i").unwrap();
    assert_ne!(args[i + 1], destination.to_str().unwrap());
    let s = args.iter().position(|a| a == "-s").unwrap();
    assert_eq!(args[s + 1], "4");
    assert_eq!(std::fs::read_to_string(destination).unwrap(), "upscaled x4");
    assert_eq!(entries(&dir), ["in.bmp", "out.png"]);
}

#[cfg(feature = "native")]
#[tokio::test]
async fn test_native_backends_convert_real_image() {
    let dir = TempDir::new().unwrap();
    image::RgbImage::new(8, 6)
        .save(dir.path().join("in.bmp"))
        .unwrap();

    let tools = FakeTools::new("");
    let config = ToolConfig {
        probe: Backend::Native,
        converter: Backend::Native,
        ..Default::default()
    };
    let engine = UpscaleEngine::with_runner(&config, tools.clone()).unwrap();

    let outcome = engine.run(&request(&dir, "in.bmp")).await.unwrap();

    assert_eq!(outcome, OutputOutcome::ConvertedOnly(Resolution::new(8, 6)));
    assert!(tools.recorded().is_empty());
    let converted = image::open(dir.path().join("out.png")).unwrap();
    assert_eq!((converted.width(), converted.height()), (8, 6));
}
