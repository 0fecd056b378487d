pub mod docx;
pub mod pdf;

pub use docx::DocxExtractor;
pub use pdf::{PdfExtractor, PdfLayoutOptions};
