//! End-to-end integration tests for timetable-extract.
//!
//! These tests use real timetable files in `./test_cases/` and make live LLM
//! API calls (and need Tesseract / pdfium installed). They are gated behind
//! the `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use std::path::PathBuf;
use timetable_extract::extract::resolve_provider;
use timetable_extract::pipeline::ocr::{OcrEngine, TesseractOcr};
use timetable_extract::pipeline::pdf::{PdfTextSource, PdfiumText};
use timetable_extract::{ErrorCode, ExtractionConfig, TimetableExtractor};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("timetable_extract=debug"))
        .with_test_writer()
        .try_init();
}

// ── Provider ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_provider_resolves_from_environment() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let provider = resolve_provider(&ExtractionConfig::default()).await;
    assert!(
        provider.is_ok(),
        "an LLM provider should be configured for e2e runs: {:?}",
        provider.err()
    );
}

// ── Live extraction ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_photographed_timetable() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("weekly_photo.jpg"));
    init_tracing();

    let extractor = TimetableExtractor::new(ExtractionConfig::default()).await;
    let output = extractor
        .extract_input(path.to_str().unwrap())
        .await
        .expect("extraction should succeed");

    assert!(!output.result.timeblocks.is_empty());
    for block in &output.result.timeblocks {
        assert!(block.end_time > block.start_time, "{block:?}");
        assert!((0.0..=1.0).contains(&block.confidence));
    }
    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

#[tokio::test]
async fn test_extract_text_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("weekly_export.pdf"));
    init_tracing();

    let extractor = TimetableExtractor::new(ExtractionConfig::default()).await;
    let output = extractor
        .extract_input(path.to_str().unwrap())
        .await
        .expect("extraction should succeed");

    assert_eq!(output.method, timetable_extract::ExtractionMethod::PdfText);
    assert!(!output.result.timeblocks.is_empty());
}

#[tokio::test]
async fn test_scanned_pdf_is_rejected() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("scanned.pdf"));

    let extractor = TimetableExtractor::new(ExtractionConfig::default()).await;
    let err = extractor
        .extract_input(path.to_str().unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::PdfProcessingFailed);
}

// ── Engines ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tesseract_reads_timetable_photo() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("weekly_photo.jpg"));

    let ocr = TesseractOcr::default();
    if !ocr.is_available() {
        println!("SKIP — tesseract not on PATH");
        return;
    }
    let bytes = std::fs::read(&path).unwrap();
    let image = timetable_extract::pipeline::preprocess::preprocess(bytes, 2000)
        .await
        .unwrap();
    let out = ocr.recognize(&image.png).await.unwrap();

    println!("confidence {:.1}\n{}", out.confidence, out.text);
    assert!(!out.text.trim().is_empty());
}

#[tokio::test]
async fn test_pdfium_extracts_text() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("weekly_export.pdf"));

    let lib_dir = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    let bytes = std::fs::read(&path).unwrap();
    let pdf = PdfiumText::new(lib_dir).extract_text(&bytes).await.unwrap();

    assert!(pdf.page_count >= 1);
    assert!(pdf.text.trim().len() >= 50);
}
