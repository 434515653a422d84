//! OCR: recognise text in a processed timetable image.
//!
//! The default engine shells out to the `tesseract` binary. It is asked for
//! TSV output rather than plain text because the TSV carries a confidence per
//! word, which is what lets the pipeline refuse garbage before it reaches the
//! model.

use crate::error::ExtractError;
use async_trait::async_trait;
use std::io::Write;
use std::process::Command;
use std::time::Instant;
use tracing::debug;

/// Recognised text with its mean word confidence (0–100).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: f32,
}

/// A text-recognition engine.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs and health output.
    fn name(&self) -> &str;

    /// Whether the engine can run on this machine.
    fn is_available(&self) -> bool;

    /// Recognise text in a PNG-encoded image.
    async fn recognize(&self, png: &[u8]) -> Result<OcrOutput, ExtractError>;
}

/// Tesseract via its command-line interface.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    fn run_blocking(language: &str, png: &[u8]) -> Result<OcrOutput, ExtractError> {
        let start = Instant::now();

        let mut file = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
        file.write_all(png)
            .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;

        let output = Command::new("tesseract")
            .arg(file.path())
            .arg("stdout")
            .args(["-l", language])
            .arg("tsv")
            .output();

        let output = match output {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(ExtractError::OcrFailed(format!(
                    "tesseract failed: {}",
                    stderr.trim()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractError::OcrFailed(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ));
            }
            Err(e) => return Err(ExtractError::OcrFailed(e.to_string())),
        };

        let result = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        debug!(
            "OCR: {} chars, confidence {:.1}, {}ms",
            result.text.len(),
            result.confidence,
            start.elapsed().as_millis()
        );
        Ok(result)
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        which::which("tesseract").is_ok()
    }

    async fn recognize(&self, png: &[u8]) -> Result<OcrOutput, ExtractError> {
        let language = self.language.clone();
        let png = png.to_vec();
        tokio::task::spawn_blocking(move || Self::run_blocking(&language, &png))
            .await
            .map_err(|e| ExtractError::Internal(format!("OCR task panicked: {}", e)))?
    }
}

/// Rebuild text and mean confidence from Tesseract TSV output.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num, left,
/// top, width, height, conf, text. Word rows (level 5) carry `conf >= 0`;
/// words sharing (block, par, line) are joined with spaces, lines with `\n`.
pub fn parse_tsv(tsv: &str) -> OcrOutput {
    let mut lines: Vec<String> = Vec::new();
    let mut current_key: Option<(&str, &str, &str, &str)> = None;
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0usize;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        let conf: f32 = cols[10].trim().parse().unwrap_or(-1.0);
        if word.is_empty() || conf < 0.0 {
            continue;
        }

        conf_sum += conf;
        conf_count += 1;

        let key = (cols[1], cols[2], cols[3], cols[4]);
        match lines.last_mut() {
            Some(line) if current_key == Some(key) => {
                line.push(' ');
                line.push_str(word);
            }
            _ => {
                lines.push(word.to_string());
                current_key = Some(key);
            }
        }
    }

    OcrOutput {
        text: lines.join("\n"),
        confidence: if conf_count == 0 {
            0.0
        } else {
            conf_sum / conf_count as f32
        },
    }
}
