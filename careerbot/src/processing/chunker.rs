use crate::config::ProcessingConfig;
use crate::error::{CareerError, Result};

/// Greedy fixed-window splitter over Unicode scalar values.
///
/// Window `n` starts at `n * (chunk_size - chunk_overlap)` and spans up to
/// `chunk_size` characters; the last window may be shorter. Identical input
/// and parameters always yield identical windows.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    /// Offset of the first character, counted in chars.
    pub start: usize,
    pub content: String,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CareerError::Validation(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(CareerError::Validation(format!(
                "chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Chunker for résumé and job posting text.
    pub fn from_config(config: &ProcessingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Chunker for a single question/answer pair.
    pub fn for_qa(config: &ProcessingConfig) -> Result<Self> {
        Self::new(config.qa_chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(TextChunk {
                index: chunks.len(),
                start,
                content: chars[start..end].iter().collect(),
            });
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Number of windows `chunk` would produce, without materializing them.
    pub fn count(&self, text: &str) -> usize {
        let len = text.chars().count();
        if len == 0 {
            return 0;
        }
        if len <= self.chunk_size {
            return 1;
        }
        let step = self.chunk_size - self.chunk_overlap;
        (len - self.chunk_size).div_ceil(step) + 1
    }
}

/// `chunk(text, maxSize, overlap)` as a plain list of strings.
pub fn chunk_text(text: &str, max_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(TextChunker::new(max_size, overlap)?
        .chunk(text)
        .into_iter()
        .map(|c| c.content)
        .collect())
}

/// Rebuild the source text from consecutive overlapping windows.
pub fn reassemble(chunks: &[TextChunk], overlap: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&chunk.content);
        } else {
            out.extend(chunk.content.chars().skip(overlap));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_produces_no_chunks() {
        let chunker = TextChunker::new(500, 20).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert_eq!(chunker.count(""), 0);
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TextChunker::new(500, 20).unwrap();
        let chunks = chunker.chunk("Rust engineer with five years of experience.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].content, "Rust engineer with five years of experience.");
    }

    #[test]
    fn test_windows_step_by_size_minus_overlap() {
        let chunker = TextChunker::new(4, 1).unwrap();
        let contents: Vec<String> = chunker
            .chunk("abcdefghij")
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_final_window_may_be_shorter() {
        let chunks = chunk_text("abcdefgh", 5, 2).unwrap();
        assert_eq!(chunks, vec!["abcde", "defgh"]);

        let chunks = chunk_text("abcdefghi", 5, 2).unwrap();
        assert_eq!(chunks, vec!["abcde", "defgh", "ghi"]);
    }

    #[test]
    fn test_reassembly_reconstructs_input() {
        let text = "Led a team of six engineers building a résumé parser. \
                    Shipped ingestion, retrieval, and generation services.\n\
                    Mentored interns; ran weekly design reviews. ✓";
        for (size, overlap) in [(10, 0), (10, 3), (7, 6), (500, 20), (1, 0)] {
            let chunker = TextChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(text);
            assert_eq!(reassemble(&chunks, overlap), text, "size={size} overlap={overlap}");
            assert_eq!(chunker.count(text), chunks.len());
        }
    }

    #[test]
    fn test_multibyte_text_is_split_on_chars() {
        let chunks = chunk_text("ééééé", 2, 0).unwrap();
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(10, 10).is_err());
        assert!(TextChunker::new(10, 11).is_err());
    }

    #[test]
    fn test_deterministic_output() {
        let text = "x".repeat(1234);
        let chunker = TextChunker::new(500, 20).unwrap();
        assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
        assert_eq!(chunker.chunk(&text).len(), 3);
    }
}
