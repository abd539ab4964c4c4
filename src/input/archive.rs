//! ZIP batch expansion

use crate::error::{MatcherError, Result};
use crate::input::file_detector::FileType;
use log::{debug, warn};
use serde::Serialize;
use std::io::{Cursor, Read};

/// A supported document read out of an archive, in archive order
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// An entry that could not be turned into a processed document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFailure {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ExpandedArchive {
    pub entries: Vec<ArchiveEntry>,
    /// Names without a supported document suffix
    pub skipped: Vec<String>,
    /// Supported names whose compressed payload could not be read
    pub unreadable: Vec<EntryFailure>,
}

/// Open `bytes` as a ZIP archive and pull out every PDF/DOCX entry.
///
/// Only a corrupt archive as a whole is an error; damaged entries are
/// reported in `unreadable` and the rest of the archive is still returned.
pub fn expand(bytes: &[u8]) -> Result<ExpandedArchive> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| MatcherError::ZipReadFailure(e.to_string()))?;

    let mut expanded = ExpandedArchive::default();

    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                warn!("Skipping unreadable archive entry #{}: {}", index, e);
                expanded.unreadable.push(EntryFailure {
                    filename: format!("#{}", index),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        if !FileType::from_filename(&name).is_document() {
            debug!("Skipping unsupported archive entry: {}", name);
            expanded.skipped.push(name);
            continue;
        }

        let mut content = Vec::with_capacity(capacity_hint(file.size()));
        match file.read_to_end(&mut content) {
            Ok(_) => expanded.entries.push(ArchiveEntry { name, bytes: content }),
            Err(e) => {
                warn!("Failed to decompress archive entry {}: {}", name, e);
                expanded.unreadable.push(EntryFailure {
                    filename: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(expanded)
}

/// Entry headers are untrusted; never preallocate more than this
const MAX_PREALLOCATION: u64 = 1 << 20;

fn capacity_hint(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOCATION) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_expand_filters_by_suffix_and_keeps_order() {
        let bytes = build_zip(&[
            ("b.docx", b"docx-bytes"),
            ("notes.txt", b"ignored"),
            ("nested/a.PDF", b"pdf-bytes"),
            ("inner.zip", b"zip-bytes"),
        ]);

        let expanded = expand(&bytes).unwrap();
        let names: Vec<&str> = expanded.entries.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["b.docx", "nested/a.PDF"]);
        assert_eq!(expanded.entries[1].bytes, b"pdf-bytes");
        assert_eq!(expanded.skipped, vec!["notes.txt".to_string(), "inner.zip".to_string()]);
        assert!(expanded.unreadable.is_empty());
    }

    #[test]
    fn test_corrupt_archive_is_zip_read_failure() {
        let err = expand(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, MatcherError::ZipReadFailure(_)));
    }

    #[test]
    fn test_empty_archive_is_empty() {
        let bytes = build_zip(&[]);
        let expanded = expand(&bytes).unwrap();
        assert!(expanded.entries.is_empty());
        assert!(expanded.skipped.is_empty());
    }

    #[test]
    fn test_capacity_hint_ignores_absurd_declared_sizes() {
        assert_eq!(capacity_hint(12), 12);
        assert_eq!(capacity_hint(u64::MAX / 2 + 7), MAX_PREALLOCATION as usize);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOCATION as usize);
    }

    #[test]
    fn test_lying_entry_size_does_not_abort_expansion() {
        let mut bytes = build_zip(&[("cv.pdf", b"pdf-bytes")]);

        // uncompressed size field of the central directory record
        let central = bytes
            .windows(4)
            .rposition(|w| w == b"PK\x01\x02")
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&0xFFFF_FFFEu32.to_le_bytes());

        match expand(&bytes) {
            Ok(expanded) => assert_eq!(expanded.entries.len() + expanded.unreadable.len(), 1),
            Err(err) => assert!(matches!(err, MatcherError::ZipReadFailure(_))),
        }
    }
}
