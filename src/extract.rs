//! The extraction entry point: route, process, call the model once, validate.
//!
//! [`TimetableExtractor`] is built once from an [`ExtractionConfig`] and then
//! shared (it is `Send + Sync` and holds no per-request state). Each call to
//! [`TimetableExtractor::extract`] runs one upload end-to-end.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::model::{ExtractionMethod, ExtractionOutput, ExtractionStats};
use crate::pipeline::encode::to_image_data;
use crate::pipeline::input;
use crate::pipeline::llm::{ModelReply, ProviderModel, TimetableModel, UnconfiguredModel};
use crate::pipeline::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::pdf::{ensure_enough_text, PdfTextSource, PdfiumText};
use crate::pipeline::preprocess::preprocess;
use crate::pipeline::route::{route, FileKind};
use crate::validate::validate_extraction;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a processor hands back before validation.
struct Processed {
    reply: ModelReply,
    method: ExtractionMethod,
    ocr_confidence: Option<f32>,
    used_fallback: bool,
}

/// Timetable extraction service.
pub struct TimetableExtractor {
    config: ExtractionConfig,
    model: Arc<dyn TimetableModel>,
    ocr: Arc<dyn OcrEngine>,
    pdf: Arc<dyn PdfTextSource>,
}

impl TimetableExtractor {
    /// Build the service with the real collaborators: the resolved LLM
    /// provider, Tesseract and pdfium.
    ///
    /// A provider that cannot be resolved does not fail construction; the
    /// service starts, [`Self::llm_configured`] reports `false` and every
    /// extraction returns the resolution error.
    pub async fn new(config: ExtractionConfig) -> Self {
        let model: Arc<dyn TimetableModel> = match resolve_provider(&config).await {
            Ok(provider) => {
                info!(
                    "LLM provider ready (model: {})",
                    config.model.as_deref().unwrap_or("provider default")
                );
                Arc::new(ProviderModel::new(provider, &config))
            }
            Err(ExtractError::ProviderNotConfigured { provider, hint }) => {
                warn!("LLM provider '{}' not configured: {}", provider, hint);
                Arc::new(UnconfiguredModel::new(provider, hint))
            }
            Err(e) => {
                warn!("LLM provider unavailable: {}", e);
                Arc::new(UnconfiguredModel::new("auto", e.to_string()))
            }
        };
        let ocr = Arc::new(TesseractOcr::new(config.ocr_language.clone()));
        let pdf = Arc::new(PdfiumText::new(config.pdfium_lib_path.clone()));
        Self::with_components(config, model, ocr, pdf)
    }

    /// Build the service from explicit collaborators.
    pub fn with_components(
        config: ExtractionConfig,
        model: Arc<dyn TimetableModel>,
        ocr: Arc<dyn OcrEngine>,
        pdf: Arc<dyn PdfTextSource>,
    ) -> Self {
        Self {
            config,
            model,
            ocr,
            pdf,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Whether an LLM provider (and so its credential) is in place.
    pub fn llm_configured(&self) -> bool {
        self.model.is_configured()
    }

    /// Whether the OCR engine can run here.
    pub fn ocr_available(&self) -> bool {
        self.ocr.is_available()
    }

    /// Extract a timetable from an uploaded document.
    ///
    /// # Errors
    /// Every failure is terminal: size/type rejections, processing failures,
    /// model errors and validation failures (with all field errors attached).
    pub async fn extract(&self, bytes: &[u8], mime: &str) -> Result<ExtractionOutput, ExtractError> {
        let start = Instant::now();

        if bytes.is_empty() {
            return Err(ExtractError::InvalidRequest("uploaded file is empty".into()));
        }
        if bytes.len() > self.config.max_file_size {
            return Err(ExtractError::FileTooLarge {
                size: bytes.len(),
                max: self.config.max_file_size,
            });
        }

        let kind = route(mime, &self.config)?;
        info!("Extracting timetable: {} ({} bytes) → {:?}", mime, bytes.len(), kind);

        let processed = match kind {
            FileKind::Image => self.process_image(bytes).await?,
            FileKind::Pdf => self.process_pdf(bytes).await?,
        };

        let validated = validate_extraction(&processed.reply.json, &self.config.validation_rules())
            .map_err(|errors| {
                warn!("Model output failed validation with {} error(s)", errors.len());
                ExtractError::ValidationFailed { errors }
            })?;

        for w in &validated.warnings {
            warn!("Validation warning: {}", w);
        }

        let stats = ExtractionStats {
            processing_time_ms: start.elapsed().as_millis() as u64,
            llm_duration_ms: processed.reply.duration_ms,
            input_tokens: processed.reply.input_tokens,
            output_tokens: processed.reply.output_tokens,
            ocr_confidence: processed.ocr_confidence,
            used_fallback: processed.used_fallback,
        };

        info!(
            "Extraction complete: {} blocks via {:?}, {} warning(s), {}ms",
            validated.result.timeblocks.len(),
            processed.method,
            validated.warnings.len(),
            stats.processing_time_ms
        );

        Ok(ExtractionOutput {
            result: validated.result,
            warnings: validated.warnings,
            method: processed.method,
            stats,
        })
    }

    /// Load a local file or URL, sniff its type and extract it.
    pub async fn extract_input(&self, input_str: &str) -> Result<ExtractionOutput, ExtractError> {
        let loaded = input::load_input(input_str, self.config.download_timeout_secs).await?;
        self.extract(&loaded.bytes, &loaded.mime).await
    }

    /// Vision first; OCR + text model once if vision fails (or is disabled).
    async fn process_image(&self, bytes: &[u8]) -> Result<Processed, ExtractError> {
        let image = preprocess(bytes.to_vec(), self.config.max_image_dimension).await?;

        if self.config.enable_vision {
            match self.model.extract_from_image(to_image_data(&image.png)).await {
                Ok(reply) => {
                    return Ok(Processed {
                        reply,
                        method: ExtractionMethod::Vision,
                        ocr_confidence: None,
                        used_fallback: false,
                    })
                }
                Err(e) if self.config.enable_ocr => {
                    warn!("Vision extraction failed, falling back to OCR: {}", e);
                    let mut processed = self.ocr_then_text(&image.png).await?;
                    processed.used_fallback = true;
                    return Ok(processed);
                }
                Err(e) => return Err(e),
            }
        }

        self.ocr_then_text(&image.png).await
    }

    async fn ocr_then_text(&self, png: &[u8]) -> Result<Processed, ExtractError> {
        let ocr = self.ocr.recognize(png).await?;
        debug!("{}: confidence {:.1}", self.ocr.name(), ocr.confidence);

        if ocr.confidence < self.config.ocr_confidence_threshold {
            return Err(ExtractError::LowOcrConfidence {
                confidence: ocr.confidence,
                threshold: self.config.ocr_confidence_threshold,
            });
        }
        let chars = ocr.text.trim().chars().count();
        if chars < self.config.min_ocr_text_chars {
            return Err(ExtractError::InsufficientOcrText {
                chars,
                min: self.config.min_ocr_text_chars,
            });
        }

        let reply = self.model.extract_from_text(&ocr.text).await?;
        Ok(Processed {
            reply,
            method: ExtractionMethod::Ocr,
            ocr_confidence: Some(ocr.confidence),
            used_fallback: false,
        })
    }

    async fn process_pdf(&self, bytes: &[u8]) -> Result<Processed, ExtractError> {
        let pdf = self.pdf.extract_text(bytes).await?;
        debug!("PDF text: {} chars over {} pages", pdf.text.len(), pdf.page_count);
        ensure_enough_text(&pdf.text, self.config.min_pdf_text_chars)?;

        let reply = self.model.extract_from_text(&pdf.text).await?;
        Ok(Processed {
            reply,
            method: ExtractionMethod::PdfText,
            ocr_confidence: None,
            used_fallback: false,
        })
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`)
/// 2. **Named provider + model** (`config.provider_name`)
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`)
/// 4. **OpenAI** when `OPENAI_API_KEY` is set
/// 5. **Full auto-detection** (`ProviderFactory::from_env`)
pub async fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
