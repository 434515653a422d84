//! Configuration types for timetable extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The config is handed to
//! [`crate::TimetableExtractor`] once at construction; nothing reads ambient
//! global state at request time.

use crate::error::ExtractError;
use crate::validate::ValidationRules;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// MIME types accepted when nothing else is configured.
pub const DEFAULT_ALLOWED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "application/pdf"];

/// Configuration for timetable extraction.
///
/// # Example
/// ```rust
/// use timetable_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .max_file_size(5 * 1024 * 1024)
///     .ocr_confidence_threshold(70.0)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Largest accepted upload in bytes. Default: 10 MiB.
    pub max_file_size: usize,

    /// MIME types the router accepts. Default: PNG, JPEG, PDF.
    pub allowed_mime_types: Vec<String>,

    /// Send processed images straight to the vision model. Default: true.
    pub enable_vision: bool,

    /// Allow Tesseract OCR, as the vision fallback or as the only image path
    /// when vision is disabled. Default: true.
    pub enable_ocr: bool,

    /// Minimum mean OCR word confidence, on Tesseract's 0–100 scale. Default: 60.
    ///
    /// Below this the recognised text is mostly noise and the model would
    /// happily invent a timetable from it.
    pub ocr_confidence_threshold: f32,

    /// Tesseract language code(s), e.g. "eng" or "eng+fra". Default: "eng".
    pub ocr_language: String,

    /// Minimum trimmed OCR text length in chars. Default: 20.
    pub min_ocr_text_chars: usize,

    /// Minimum trimmed embedded-text length for a PDF. Default: 50.
    ///
    /// Scanned PDFs carry an image per page and no text layer; anything under
    /// this is treated as one and rejected.
    pub min_pdf_text_chars: usize,

    /// Bounding box (both edges) images are downscaled to fit. Default: 2000.
    pub max_image_dimension: u32,

    /// Confidence below which the validator attaches a warning. Default: 0.5.
    pub low_confidence_threshold: f64,

    /// LLM model identifier. If None, uses "gpt-4.1-nano" for named providers.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in prompt.
    pub system_prompt: Option<String>,

    /// Directory holding the pdfium shared library. If None, the system
    /// library search path is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            enable_vision: true,
            enable_ocr: true,
            ocr_confidence_threshold: 60.0,
            ocr_language: "eng".to_string(),
            min_ocr_text_chars: 20,
            min_pdf_text_chars: 50,
            max_image_dimension: 2000,
            low_confidence_threshold: 0.5,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            system_prompt: None,
            pdfium_lib_path: None,
            download_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("max_file_size", &self.max_file_size)
            .field("allowed_mime_types", &self.allowed_mime_types)
            .field("enable_vision", &self.enable_vision)
            .field("enable_ocr", &self.enable_ocr)
            .field("ocr_confidence_threshold", &self.ocr_confidence_threshold)
            .field("ocr_language", &self.ocr_language)
            .field("max_image_dimension", &self.max_image_dimension)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Thresholds handed to the validator.
    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            low_confidence_threshold: self.low_confidence_threshold,
            ..ValidationRules::default()
        }
    }

    /// Whether `mime` is on the allow-list (parameters like `; charset` ignored).
    pub fn is_allowed_mime(&self, mime: &str) -> bool {
        let essence = mime_essence(mime);
        self.allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&essence))
    }
}

/// Lowercased MIME type without parameters: `"Image/PNG; q=1"` → `"image/png"`.
pub fn mime_essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.config.max_file_size = bytes.max(1);
        self
    }

    pub fn allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.allowed_mime_types = types
            .into_iter()
            .map(|s| mime_essence(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn enable_vision(mut self, v: bool) -> Self {
        self.config.enable_vision = v;
        self
    }

    pub fn enable_ocr(mut self, v: bool) -> Self {
        self.config.enable_ocr = v;
        self
    }

    pub fn ocr_confidence_threshold(mut self, t: f32) -> Self {
        self.config.ocr_confidence_threshold = t.clamp(0.0, 100.0);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn min_ocr_text_chars(mut self, n: usize) -> Self {
        self.config.min_ocr_text_chars = n;
        self
    }

    pub fn min_pdf_text_chars(mut self, n: usize) -> Self {
        self.config.min_pdf_text_chars = n;
        self
    }

    pub fn max_image_dimension(mut self, px: u32) -> Self {
        self.config.max_image_dimension = px.max(100);
        self
    }

    pub fn low_confidence_threshold(mut self, t: f64) -> Self {
        self.config.low_confidence_threshold = t.clamp(0.0, 1.0);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !c.enable_vision && !c.enable_ocr {
            return Err(ExtractError::InvalidConfig(
                "At least one of vision or OCR must be enabled for image uploads".into(),
            ));
        }
        if c.allowed_mime_types.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "The allowed MIME type list is empty".into(),
            ));
        }
        if let Some(bad) = c
            .allowed_mime_types
            .iter()
            .find(|m| !m.starts_with("image/") && m.as_str() != "application/pdf")
        {
            return Err(ExtractError::InvalidConfig(format!(
                "'{bad}' cannot be processed; only image/* and application/pdf are supported"
            )));
        }
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// Where the HTTP service listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    /// Default: 3000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
