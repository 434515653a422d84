//! Pipeline stages for timetable extraction.
//!
//! Each submodule implements exactly one step. The seams that touch the
//! outside world ([`llm::TimetableModel`], [`ocr::OcrEngine`],
//! [`pdf::PdfTextSource`]) are traits so the orchestrator can be exercised
//! without a model, a Tesseract binary or a pdfium library.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─ image ─▶ preprocess ─▶ encode ─▶ llm (vision)
//! route ─────┤                              └─(fails)─▶ ocr ─▶ llm (text)
//!            └─ pdf ───▶ pdf text ────────────────────────────▶ llm (text)
//!                                                                 │
//!                                              reply ◀────────────┘
//! ```
//!
//! 1. [`route`] : allow-list check and processor choice by MIME type
//! 2. [`preprocess`]: decode, fit to bounding box, contrast stretch
//! 3. [`encode`]: PNG bytes and base64 `ImageData`
//! 4. [`ocr`]   : Tesseract text with confidence
//! 5. [`pdf`]   : embedded text via pdfium
//! 6. [`llm`]   : the single model call
//! 7. [`reply`] : JSON recovery from the reply text
//! 8. [`input`] : CLI only: path/URL to bytes with a sniffed MIME type

pub mod encode;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pdf;
pub mod preprocess;
pub mod reply;
pub mod route;
