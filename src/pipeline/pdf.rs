//! PDF text extraction via pdfium.
//!
//! Only the embedded text layer is read. A timetable exported from a
//! spreadsheet or school MIS has one; a scanned sheet does not, and for those
//! the caller is told to upload an image instead (the pipeline never
//! rasterises PDFs).
//!
//! pdfium is not async-safe, so extraction runs on the blocking pool.

use crate::error::ExtractError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Embedded text of a whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfText {
    pub text: String,
    pub page_count: usize,
}

/// A source of embedded PDF text.
#[async_trait]
pub trait PdfTextSource: Send + Sync {
    async fn extract_text(&self, bytes: &[u8]) -> Result<PdfText, ExtractError>;
}

/// Extracts text with pdfium-render.
#[derive(Debug, Clone, Default)]
pub struct PdfiumText {
    /// Directory holding the pdfium library; system search path when None.
    lib_dir: Option<PathBuf>,
}

impl PdfiumText {
    pub fn new(lib_dir: Option<PathBuf>) -> Self {
        Self { lib_dir }
    }

    fn bind(&self) -> Result<Pdfium, ExtractError> {
        let bindings = match &self.lib_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| {
            ExtractError::Internal(format!(
                "Failed to bind to pdfium library: {e:?}\nSet PDFIUM_LIB_PATH to the directory containing libpdfium."
            ))
        })?;
        Ok(Pdfium::new(bindings))
    }

    fn extract_blocking(&self, bytes: &[u8]) -> Result<PdfText, ExtractError> {
        let pdfium = self.bind()?;

        let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                ExtractError::PdfProcessing("document is password-protected".into())
            } else {
                ExtractError::PdfProcessing(format!("could not open PDF: {err_str}"))
            }
        })?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        info!("PDF loaded: {} pages", page_count);

        let mut text = String::new();
        for (idx, page) in pages.iter().enumerate() {
            let page_text = page.text().map_err(|e| {
                ExtractError::PdfProcessing(format!("could not read text of page {}: {e:?}", idx + 1))
            })?;
            let content = page_text.all();
            debug!("Page {}: {} chars of text", idx + 1, content.len());
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(content.trim_end());
        }

        Ok(PdfText { text, page_count })
    }
}

#[async_trait]
impl PdfTextSource for PdfiumText {
    async fn extract_text(&self, bytes: &[u8]) -> Result<PdfText, ExtractError> {
        let source = self.clone();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || source.extract_blocking(&bytes))
            .await
            .map_err(|e| ExtractError::Internal(format!("PDF task panicked: {}", e)))?
    }
}

/// Reject text that is too short to be a real timetable.
pub fn ensure_enough_text(text: &str, min_chars: usize) -> Result<(), ExtractError> {
    let chars = text.trim().chars().count();
    if chars < min_chars {
        return Err(ExtractError::ScannedPdf {
            chars,
            min: min_chars,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_treated_as_scan() {
        let err = ensure_enough_text("  \n Page 1 \n ", 50).unwrap_err();
        match err {
            ExtractError::ScannedPdf { chars, min } => {
                assert_eq!(chars, 6);
                assert_eq!(min, 50);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn long_text_passes() {
        let text = "Monday 09:00-09:30 Maths\nMonday 10:30-10:45 Break\nTuesday 09:00-10:00 Art";
        assert!(ensure_enough_text(text, 50).is_ok());
    }
}
