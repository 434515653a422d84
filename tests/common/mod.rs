//! Test doubles for the model, OCR and PDF seams.
#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_llm::ImageData;
use image::{DynamicImage, Rgb, RgbImage};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use timetable_extract::pipeline::encode::encode_png;
use timetable_extract::pipeline::llm::{ModelReply, TimetableModel};
use timetable_extract::pipeline::ocr::{OcrEngine, OcrOutput};
use timetable_extract::pipeline::pdf::{PdfText, PdfTextSource};
use timetable_extract::{ExtractError, ExtractionConfig, TimetableExtractor};

fn reply(json: Value) -> ModelReply {
    ModelReply {
        json,
        input_tokens: 120,
        output_tokens: 80,
        duration_ms: 7,
    }
}

/// Model with canned replies; `None` makes that call fail.
pub struct MockModel {
    vision: Option<Value>,
    text: Option<Value>,
    pub vision_calls: AtomicUsize,
    pub text_calls: AtomicUsize,
}

impl MockModel {
    pub fn new(vision: Option<Value>, text: Option<Value>) -> Arc<Self> {
        Arc::new(Self {
            vision,
            text,
            vision_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
        })
    }

    pub fn vision_calls(&self) -> usize {
        self.vision_calls.load(Ordering::SeqCst)
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimetableModel for MockModel {
    async fn extract_from_image(&self, _image: ImageData) -> Result<ModelReply, ExtractError> {
        self.vision_calls.fetch_add(1, Ordering::SeqCst);
        self.vision.clone().map(reply).ok_or_else(|| ExtractError::LlmApiError {
            message: "vision model unavailable".into(),
        })
    }

    async fn extract_from_text(&self, _text: &str) -> Result<ModelReply, ExtractError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone().map(reply).ok_or_else(|| ExtractError::LlmApiError {
            message: "text model unavailable".into(),
        })
    }
}

pub struct MockOcr {
    output: OcrOutput,
    pub calls: AtomicUsize,
}

impl MockOcr {
    pub fn new(text: &str, confidence: f32) -> Arc<Self> {
        Arc::new(Self {
            output: OcrOutput {
                text: text.to_string(),
                confidence,
            },
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    fn name(&self) -> &str {
        "mock-ocr"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, _png: &[u8]) -> Result<OcrOutput, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

pub struct MockPdf {
    text: String,
    pub calls: AtomicUsize,
}

impl MockPdf {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfTextSource for MockPdf {
    async fn extract_text(&self, _bytes: &[u8]) -> Result<PdfText, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PdfText {
            text: self.text.clone(),
            page_count: 1,
        })
    }
}

/// Everything a test needs to inspect after a run.
pub struct Harness {
    pub extractor: TimetableExtractor,
    pub model: Arc<MockModel>,
    pub ocr: Arc<MockOcr>,
    pub pdf: Arc<MockPdf>,
}

impl Harness {
    pub fn new(
        config: ExtractionConfig,
        model: Arc<MockModel>,
        ocr: Arc<MockOcr>,
        pdf: Arc<MockPdf>,
    ) -> Self {
        let extractor =
            TimetableExtractor::with_components(config, model.clone(), ocr.clone(), pdf.clone());
        Self {
            extractor,
            model,
            ocr,
            pdf,
        }
    }

    /// Default config; the model answers both paths with the two-entry timetable.
    pub fn happy() -> Self {
        Self::new(
            ExtractionConfig::default(),
            MockModel::new(Some(two_entry_timetable()), Some(two_entry_timetable())),
            MockOcr::new(OCR_TEXT, 88.0),
            MockPdf::new(PDF_TEXT),
        )
    }

    pub fn processor_calls(&self) -> usize {
        self.model.vision_calls() + self.model.text_calls() + self.ocr.calls() + self.pdf.calls()
    }
}

pub const OCR_TEXT: &str = "Monday 9:00-9:30 Maths\nMonday 10:30-10:45 Break";

pub const PDF_TEXT: &str = "Class 4B Weekly Timetable\n\
Monday 09:00 - 09:30 Maths\n\
Monday 10:30 - 10:45 Break\n";

/// The model's answer for a Monday with Maths then Break.
pub fn two_entry_timetable() -> Value {
    json!({
        "metadata": {
            "teacher_name": "Ms Rivera",
            "class_name": "4B",
            "extraction_confidence": 0.92
        },
        "timeblocks": [
            {
                "day": "Monday",
                "start_time": "09:00",
                "end_time": "09:30",
                "subject": "Maths",
                "subject_type": "academic",
                "confidence": 0.95
            },
            {
                "day": "Monday",
                "start_time": "10:30",
                "end_time": "10:45",
                "subject": "Break",
                "subject_type": "break",
                "confidence": 0.9
            }
        ]
    })
}

/// A block that ends before it starts.
pub fn backwards_timetable() -> Value {
    json!({
        "timeblocks": [
            {
                "day": "Tuesday",
                "start_time": "11:00",
                "end_time": "10:00",
                "subject": "Science",
                "subject_type": "academic",
                "confidence": 0.8
            }
        ]
    })
}

/// A small real PNG.
pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_fn(64, 48, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([25, 25, 25])
        } else {
            Rgb([230, 230, 230])
        }
    });
    encode_png(&DynamicImage::ImageRgb8(img)).unwrap()
}

pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n%mock document\n".to_vec()
}
