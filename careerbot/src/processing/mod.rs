mod chunker;
mod extractor;
mod sections;

pub mod extractors;

pub use chunker::{chunk_text, reassemble, TextChunk, TextChunker};
pub use extractor::{DocumentExtractor, DocumentKind, ExtractedText, DOCX_MEDIA_TYPE, PDF_MEDIA_TYPE};
pub use sections::{LocatedSection, SectionSplitter, SECTION_KEYWORDS};
