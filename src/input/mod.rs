//! Input processing module
//! Handles file detection, text extraction from PDF/DOCX, and archive expansion

pub mod archive;
pub mod file_detector;
pub mod manager;
pub mod text_extractor;

pub use archive::ArchiveEntry;
pub use file_detector::FileType;
pub use manager::InputManager;
