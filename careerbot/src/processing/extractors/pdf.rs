//! PDF text extraction with layout normalisation.

use regex::Regex;

use crate::error::{CareerError, Result};

/// How aggressively extracted glyph runs are merged back together.
///
/// `pdf-extract` renders each page as positioned text, padding horizontal
/// gaps with spaces and vertical gaps with blank lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfLayoutOptions {
    /// A horizontal gap wider than this many characters ends the line, so
    /// side-by-side columns are not fused into one line of text.
    pub x_tolerance: f32,
    /// Runs of more than this many blank lines collapse to one.
    pub y_tolerance: f32,
}

impl Default for PdfLayoutOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            y_tolerance: 1.5,
        }
    }
}

pub struct PdfExtractor;

impl PdfExtractor {
    pub fn extract(bytes: &[u8], options: PdfLayoutOptions) -> Result<String> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| CareerError::Extraction(format!("PDF extraction failed: {e}")))?;

        tracing::debug!(pages = pages.len(), "PDF pages extracted");

        Self::normalize_pages(&pages, options)
    }

    pub fn normalize_pages(pages: &[String], options: PdfLayoutOptions) -> Result<String> {
        let min_gap = options.x_tolerance.max(0.0).floor() as usize + 1;
        let gap = Regex::new(&format!("[ \\t]{{{min_gap},}}"))
            .map_err(|e| CareerError::Internal(format!("Invalid gap pattern: {e}")))?;
        let max_blank_run = options.y_tolerance.max(0.0).floor() as usize;

        let normalized: Vec<String> = pages
            .iter()
            .map(|page| Self::normalize_page(page, &gap, max_blank_run))
            .filter(|page| !page.is_empty())
            .collect();

        Ok(normalized.join("\n").trim().to_string())
    }

    fn normalize_page(page: &str, gap: &Regex, max_blank_run: usize) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for raw_line in page.lines() {
            let mut pieces = gap
                .split(raw_line.trim())
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .peekable();
            if pieces.peek().is_none() {
                lines.push("");
            } else {
                lines.extend(pieces);
            }
        }

        let mut collapsed: Vec<&str> = Vec::with_capacity(lines.len());
        let mut i = 0;
        while i < lines.len() {
            if !lines[i].is_empty() {
                collapsed.push(lines[i]);
                i += 1;
                continue;
            }
            let run_end = lines[i..]
                .iter()
                .position(|line| !line.is_empty())
                .map_or(lines.len(), |offset| i + offset);
            let run = run_end - i;
            let keep = if run > max_blank_run { 1 } else { run };
            collapsed.extend(std::iter::repeat("").take(keep));
            i = run_end;
        }

        collapsed.join("\n").trim().to_string()
    }
}
