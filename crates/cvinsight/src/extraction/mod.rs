//! Format-level readers: ZIP expansion, PDF text and images, DOCX text and media.

pub mod archive;
pub mod docx;
pub mod pdf;

pub use archive::{ArchiveExpansion, expand_zip};
pub use pdf::{PageImages, PdfText};
