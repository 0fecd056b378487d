use std::fmt;

use crate::config::ProcessingConfig;
use crate::error::{CareerError, Result};

use super::extractors::{DocxExtractor, PdfExtractor, PdfLayoutOptions};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Upload formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Docx => f.write_str("docx"),
        }
    }
}

/// Normalized plain text of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub kind: DocumentKind,
    pub word_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor {
    pdf_layout: PdfLayoutOptions,
}

impl DocumentExtractor {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            pdf_layout: PdfLayoutOptions {
                x_tolerance: config.pdf_x_tolerance,
                y_tolerance: config.pdf_y_tolerance,
            },
        }
    }

    /// Extract text from `bytes` declared as `media_type`.
    ///
    /// A missing or generic (`application/octet-stream`) media type is
    /// resolved by sniffing the bytes. Anything other than PDF or DOCX fails
    /// with [`CareerError::UnsupportedFormat`].
    pub fn extract(&self, bytes: &[u8], media_type: Option<&str>) -> Result<ExtractedText> {
        let kind = Self::resolve_kind(bytes, media_type)?;

        let text = match kind {
            DocumentKind::Pdf => PdfExtractor::extract(bytes, self.pdf_layout)?,
            DocumentKind::Docx => DocxExtractor::extract(bytes)?,
        };
        let text = normalize_line_breaks(&text);
        let word_count = text.split_whitespace().count();

        tracing::debug!(kind = %kind, bytes = bytes.len(), word_count, "Document extracted");

        Ok(ExtractedText {
            text,
            kind,
            word_count,
        })
    }

    pub fn resolve_kind(bytes: &[u8], media_type: Option<&str>) -> Result<DocumentKind> {
        let declared = media_type
            .map(|m| m.split(';').next().unwrap_or_default().trim().to_lowercase())
            .filter(|m| !m.is_empty() && m != "application/octet-stream");

        match declared.as_deref() {
            Some(PDF_MEDIA_TYPE) => Ok(DocumentKind::Pdf),
            Some(DOCX_MEDIA_TYPE) => Ok(DocumentKind::Docx),
            Some(other) => Err(CareerError::UnsupportedFormat(format!(
                "Unsupported media type '{other}': expected PDF or DOCX"
            ))),
            None => Self::detect_kind(bytes).ok_or_else(|| {
                CareerError::UnsupportedFormat(
                    "Could not detect a PDF or DOCX document from the uploaded bytes".to_string(),
                )
            }),
        }
    }

    fn detect_kind(bytes: &[u8]) -> Option<DocumentKind> {
        match infer::get(bytes).map(|t| t.mime_type()) {
            Some(PDF_MEDIA_TYPE) => Some(DocumentKind::Pdf),
            Some(DOCX_MEDIA_TYPE) => Some(DocumentKind::Docx),
            Some("application/zip") => {
                let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).ok()?;
                let found = archive.by_name("word/document.xml").is_ok();
                found.then_some(DocumentKind::Docx)
            }
            _ => None,
        }
    }
}

fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}
