//! Text extraction from in-memory PDF and DOCX payloads

use crate::error::{MatcherError, Result};
use regex::Regex;
use std::io::{Cursor, Read};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

pub trait TextExtractor {
    /// Extract plain text; `filename` is only used for error reporting
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String>;
}

/// Page-oriented extraction: one newline between pages
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        // pdf-extract panics on some malformed font tables instead of erroring
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }))
        .map_err(|_| MatcherError::extraction(filename, "PDF reader aborted on malformed input"))?
        .map_err(|e| MatcherError::extraction(filename, e))?;

        Ok(join_blocks(pages.iter().map(String::as_str)))
    }
}

/// Paragraph-oriented extraction from `word/document.xml`
pub struct DocxExtractor;

const DOCUMENT_PART: &str = "word/document.xml";

impl TextExtractor for DocxExtractor {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| MatcherError::extraction(filename, format!("not a DOCX container: {}", e)))?;

        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| MatcherError::extraction(filename, format!("missing {}: {}", DOCUMENT_PART, e)))?
            .read_to_string(&mut xml)
            .map_err(|e| MatcherError::extraction(filename, format!("unreadable {}: {}", DOCUMENT_PART, e)))?;

        let paragraphs = docx_paragraphs(&xml);
        Ok(join_blocks(paragraphs.iter().map(String::as_str)))
    }
}

fn join_blocks<'a>(blocks: impl Iterator<Item = &'a str>) -> String {
    let mut text = String::new();
    for block in blocks {
        text.push_str(block);
        text.push('\n');
    }
    text.trim().to_string()
}

fn paragraph_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `<w:p>` or `<w:p attr=..>` but not `<w:pPr>`; empty paragraphs are self-closing, with or without attributes
    RE.get_or_init(|| {
        Regex::new(r"(?s)<w:p(?:\s[^>]*?)?(?:/>|>(.*?)</w:p>)").expect("Invalid paragraph regex")
    })
}

fn run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\s*/>|<w:(?:br|cr)(?:\s[^>]*)?/>")
            .expect("Invalid run regex")
    })
}

/// Text of every paragraph in document order, empty paragraphs included
fn docx_paragraphs(xml: &str) -> Vec<String> {
    paragraph_regex()
        .captures_iter(xml)
        .map(|para| {
            let body = para.get(1).map(|m| m.as_str()).unwrap_or("");
            let mut text = String::new();
            for run in run_regex().captures_iter(body) {
                match run.get(1) {
                    Some(t) => text.push_str(&decode_entities(t.as_str())),
                    None if run[0].starts_with("<w:tab") => text.push('\t'),
                    None => text.push('\n'),
                }
            }
            text
        })
        .collect()
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9A-Fa-f]+)|(lt|gt|quot|apos|amp));").expect("Invalid entity regex")
    })
}

/// Single pass, so `&amp;lt;` stays `&lt;`. Unrepresentable code points are kept verbatim.
fn decode_entities(value: &str) -> String {
    entity_regex()
        .replace_all(value, |caps: &regex::Captures| {
            let code_point = match (caps.get(1), caps.get(2)) {
                (Some(dec), _) => dec.as_str().parse::<u32>().ok(),
                (_, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
                _ => {
                    return match &caps[3] {
                        "lt" => "<",
                        "gt" => ">",
                        "quot" => "\"",
                        "apos" => "'",
                        _ => "&",
                    }
                    .to_string();
                }
            };
            code_point
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Minimal DOCX container with one `<w:p>` per paragraph
    pub(crate) fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| {
                if p.is_empty() {
                    "<w:p/>".to_string()
                } else {
                    format!(
                        r#"<w:p w:rsidR="00A1"><w:pPr><w:pStyle w:val="Normal"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                        p.replace('&', "&amp;").replace('<', "&lt;")
                    )
                }
            })
            .collect();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("[Content_Types].xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.start_file(DOCUMENT_PART, SimpleFileOptions::default()).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_docx_paragraphs_joined_by_newline() {
        let bytes = build_docx(&["Senior Engineer", "Rust & Go", "", "Remote"]);
        let text = DocxExtractor.extract("cv.docx", &bytes).unwrap();

        assert_eq!(text, "Senior Engineer\nRust & Go\n\nRemote");
    }

    #[test]
    fn test_docx_runs_tabs_and_breaks() {
        let xml = r#"<w:body><w:p><w:r><w:t>Skills:</w:t><w:tab/><w:t xml:space="preserve"> Rust</w:t><w:br/><w:t>SQL</w:t></w:r></w:p></w:body>"#;
        let paragraphs = docx_paragraphs(xml);

        assert_eq!(paragraphs, vec!["Skills:\t Rust\nSQL".to_string()]);
    }

    #[test]
    fn test_paragraph_properties_are_not_paragraphs() {
        let xml = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>Title</w:t></w:r></w:p>"#;
        assert_eq!(docx_paragraphs(xml), vec!["Title".to_string()]);
    }

    #[test]
    fn test_attributed_empty_paragraph_keeps_its_line() {
        let xml = r#"<w:p><w:r><w:t>First</w:t></w:r></w:p><w:p w:rsidR="00A1" w:rsidRDefault="00A1"/><w:p><w:r><w:t>Third</w:t></w:r></w:p>"#;
        assert_eq!(docx_paragraphs(xml), vec!["First", "", "Third"]);
    }

    #[test]
    fn test_entities_are_decoded_once() {
        assert_eq!(decode_entities("don&#8217;t &#x2013; R&amp;D &lt;b&gt;"), "don\u{2019}t \u{2013} R&D <b>");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("&#xD800; &#99999999999;"), "&#xD800; &#99999999999;");
        assert_eq!(decode_entities("AT&T &nbsp;"), "AT&T &nbsp;");
    }

    #[test]
    fn test_corrupt_docx_is_extraction_failure() {
        let err = DocxExtractor.extract("broken.docx", b"fake docx content").unwrap_err();
        match err {
            MatcherError::ExtractionFailure { filename, .. } => assert_eq!(filename, "broken.docx"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zip_without_document_part_is_extraction_failure() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("hello.txt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"hi").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(matches!(
            DocxExtractor.extract("empty.docx", &bytes),
            Err(MatcherError::ExtractionFailure { .. })
        ));
    }

    /// One Courier text line per page
    fn build_pdf(pages: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let kids: Vec<Object> = pages
            .iter()
            .map(|line| {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 24.into()]),
                        Operation::new("Td", vec![100.into(), 600.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*line)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                }))
            })
            .collect();

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_pages_extracted_in_order() {
        let bytes = build_pdf(&["Rustacean", "Ferris"]);
        let text = PdfExtractor.extract("resume.pdf", &bytes).unwrap();

        let first = text.find("Rustacean").expect("first page text");
        let second = text.find("Ferris").expect("second page text");
        assert!(first < second);
        assert!(text[first..second].contains('\n'));
    }

    #[test]
    fn test_corrupt_pdf_is_extraction_failure() {
        let err = PdfExtractor.extract("resume.pdf", b"fake pdf content").unwrap_err();
        assert!(matches!(err, MatcherError::ExtractionFailure { ref filename, .. } if filename == "resume.pdf"));
    }

    #[test]
    fn test_join_blocks_trims_outer_whitespace() {
        let text = join_blocks(["  page one", "page two  ", ""].into_iter());
        assert_eq!(text, "page one\npage two");
    }
}
