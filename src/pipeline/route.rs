//! File routing: pick exactly one processor for an upload.

use crate::config::{mime_essence, ExtractionConfig};
use crate::error::ExtractError;

/// Which processor handles an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
}

/// Route by MIME type.
///
/// The allow-list is checked first, so a type like `image/gif` is refused
/// even though it would otherwise match the `image/` prefix.
pub fn route(mime: &str, config: &ExtractionConfig) -> Result<FileKind, ExtractError> {
    let essence = mime_essence(mime);
    let unsupported = || ExtractError::UnsupportedFileType {
        mime: essence.clone(),
        allowed: config.allowed_mime_types.clone(),
    };

    if !config.is_allowed_mime(&essence) {
        return Err(unsupported());
    }
    if essence.starts_with("image/") {
        Ok(FileKind::Image)
    } else if essence == "application/pdf" {
        Ok(FileKind::Pdf)
    } else {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_allowed_types() {
        let c = ExtractionConfig::default();
        assert_eq!(route("image/png", &c).unwrap(), FileKind::Image);
        assert_eq!(route("image/jpeg", &c).unwrap(), FileKind::Image);
        assert_eq!(route("Application/PDF", &c).unwrap(), FileKind::Pdf);
    }

    #[test]
    fn gif_is_unsupported_by_default() {
        let c = ExtractionConfig::default();
        match route("image/gif", &c).unwrap_err() {
            ExtractError::UnsupportedFileType { mime, allowed } => {
                assert_eq!(mime, "image/gif");
                assert_eq!(allowed.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn extra_image_types_can_be_allowed() {
        let c = ExtractionConfig::builder()
            .allowed_mime_types(["image/webp"])
            .build()
            .unwrap();
        assert_eq!(route("image/webp", &c).unwrap(), FileKind::Image);
        assert!(route("image/png", &c).is_err());
    }

    #[test]
    fn non_document_types_are_unsupported() {
        let c = ExtractionConfig::default();
        assert!(route("text/plain", &c).is_err());
        assert!(route("", &c).is_err());
    }
}
