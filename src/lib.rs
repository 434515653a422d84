//! # timetable-extract
//!
//! Extract structured weekly timetables from uploaded images and PDFs using
//! Vision/Language Models.
//!
//! ## Why this crate?
//!
//! Teachers' timetables arrive as phone photos, scans and exported PDFs with
//! every layout imaginable. Rather than guess at grid structure, this crate
//! hands the document (or its text) to an LLM with a fixed JSON schema and
//! then refuses to trust the answer: every block is checked against the
//! schema and clock rules before it is returned.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Route     size limit + MIME allow-list → image | pdf
//!  ├─ 2. Process   image: resize/contrast → vision LLM (OCR fallback once)
//!  │               pdf:   embedded text → text LLM
//!  ├─ 3. Parse     recover one JSON object from the reply
//!  ├─ 4. Validate  schema, HH:MM times, end > start, durations, warnings
//!  └─ 5. Output    ExtractionResult + warnings + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use timetable_extract::{ExtractionConfig, TimetableExtractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let extractor = TimetableExtractor::new(ExtractionConfig::default()).await;
//!     let bytes = std::fs::read("timetable.png")?;
//!     let output = extractor.extract(&bytes, "image/png").await?;
//!     for block in &output.result.timeblocks {
//!         println!("{} {}-{} {}", block.day, block.start_time, block.end_time, block.subject);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | The axum HTTP surface (`POST /extract`, `GET /health`) |
//! | `cli`    | on      | The `timetable-extract` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ServerConfig};
pub use error::{ErrorCode, ExtractError, FieldIssue};
pub use extract::TimetableExtractor;
pub use model::{
    Day, ExtractionMethod, ExtractionOutput, ExtractionResult, ExtractionStats, SubjectType,
    TimeBlock, TimetableMetadata,
};
pub use validate::{validate_extraction, Validated, ValidationRules};
