//! Input manager: dispatches named payloads to the matching text extractor

use crate::error::{MatcherError, Result};
use crate::input::file_detector::FileType;
use crate::input::text_extractor::{DocxExtractor, PdfExtractor, TextExtractor};
use log::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct InputManager;

impl InputManager {
    pub fn new() -> Self {
        Self
    }

    /// Convert a named binary blob into plain text.
    ///
    /// Dispatch is by filename suffix. Archives are not documents: they go
    /// through [`crate::input::archive::expand`] instead.
    pub fn extract_text(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let text = match FileType::from_filename(filename) {
            FileType::Pdf => {
                debug!("Extracting text from PDF: {}", filename);
                PdfExtractor.extract(filename, bytes)?
            }
            FileType::Docx => {
                debug!("Extracting text from DOCX: {}", filename);
                DocxExtractor.extract(filename, bytes)?
            }
            FileType::Zip | FileType::Unknown => {
                return Err(MatcherError::UnsupportedFileType {
                    filename: filename.to_string(),
                });
            }
        };

        debug!("Extracted {} characters from {}", text.len(), filename);
        Ok(text)
    }

    pub fn is_supported(&self, filename: &str) -> bool {
        FileType::from_filename(filename).is_document()
    }
}
