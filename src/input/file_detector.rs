//! File type detection

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
    Zip,
    Unknown,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => FileType::Pdf,
            "docx" => FileType::Docx,
            "zip" => FileType::Zip,
            _ => FileType::Unknown,
        }
    }

    /// Detect by filename suffix, case-insensitively. Archive entry names may
    /// carry directory components; only the final extension counts.
    pub fn from_filename(filename: &str) -> Self {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(FileType::Unknown)
    }

    /// Formats a single document can be extracted from
    pub fn is_document(self) -> bool {
        matches!(self, FileType::Pdf | FileType::Docx)
    }
}
