//! Output types: the normalized timetable plus per-request processing stats.
//!
//! [`ExtractionResult`] is what the model was asked to produce, after
//! validation and enrichment. [`ExtractionOutput`] wraps it with everything
//! the pipeline learned on the way (warnings, which path ran, timings).

use crate::error::FieldIssue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Day of the week a block is scheduled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = ();

    /// Accepts the full English name or its three-letter abbreviation,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Day::ALL
            .into_iter()
            .find(|d| {
                let name = d.as_str().to_ascii_lowercase();
                lower == name || lower == name[..3]
            })
            .ok_or(())
    }
}

/// What kind of period a block is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    #[default]
    Academic,
    Break,
    Administrative,
    Other,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Academic => "academic",
            SubjectType::Break => "break",
            SubjectType::Administrative => "administrative",
            SubjectType::Other => "other",
        }
    }
}

impl FromStr for SubjectType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "academic" => Ok(SubjectType::Academic),
            "break" => Ok(SubjectType::Break),
            "administrative" => Ok(SubjectType::Administrative),
            "other" => Ok(SubjectType::Other),
            _ => Err(()),
        }
    }
}

/// One scheduled interval on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub day: Day,
    /// Zero-padded `HH:MM`.
    pub start_time: String,
    /// Zero-padded `HH:MM`, strictly after `start_time`.
    pub end_time: String,
    /// Always `end - start` in minutes once validated.
    pub duration_minutes: u32,
    /// Preserved verbatim from the document.
    pub subject: String,
    pub subject_type: SubjectType,
    pub notes: Option<String>,
    /// 0–1.
    pub confidence: f64,
}

/// Document-level information the model found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableMetadata {
    pub teacher_name: Option<String>,
    pub class_name: Option<String>,
    pub term: Option<String>,
    pub school_name: Option<String>,
    /// 0–1. Default: 0.5.
    pub extraction_confidence: f64,
}

impl Default for TimetableMetadata {
    fn default() -> Self {
        Self {
            teacher_name: None,
            class_name: None,
            term: None,
            school_name: None,
            extraction_confidence: 0.5,
        }
    }
}

/// A validated, enriched timetable. Always holds at least one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub metadata: TimetableMetadata,
    pub timeblocks: Vec<TimeBlock>,
}

/// Which path produced the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Processed image sent straight to the vision model.
    Vision,
    /// OCR text sent to the text model.
    Ocr,
    /// Embedded PDF text sent to the text model.
    PdfText,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Vision => "vision",
            ExtractionMethod::Ocr => "ocr",
            ExtractionMethod::PdfText => "pdf_text",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing and usage figures for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub processing_time_ms: u64,
    pub llm_duration_ms: u64,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Mean OCR word confidence (0–100) when OCR ran.
    pub ocr_confidence: Option<f32>,
    /// True when the vision call failed and OCR took over.
    pub used_fallback: bool,
}

/// Everything returned for one successful extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub result: ExtractionResult,
    pub warnings: Vec<FieldIssue>,
    pub method: ExtractionMethod,
    pub stats: ExtractionStats,
}
