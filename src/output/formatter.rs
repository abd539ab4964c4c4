//! Output formatters for match results, search hits and processed documents

use crate::error::Result;
use crate::matching::{ArchiveReport, MatchResult, ProcessedDocument, SearchHit};
use colored::{Color, Colorize};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Console,
    Json,
}

pub trait OutputFormatter {
    fn format_match(&self, result: &MatchResult) -> Result<String>;
    fn format_search(&self, query: &str, hits: &[SearchHit]) -> Result<String>;
    fn format_document(&self, document: &ProcessedDocument) -> Result<String>;
    fn format_archive(&self, report: &ArchiveReport) -> Result<String>;
}

pub fn formatter_for(format: OutputFormat, use_colors: bool, detailed: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter::new(use_colors, detailed)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

/// Console formatter with colored scores
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str) -> String {
        if self.use_colors {
            format!("\n{} {}\n", "█".blue().bold(), title.blue().bold())
        } else {
            format!("\n█ {}\n", title)
        }
    }

    fn format_score(&self, score: f32) -> String {
        let color = match score {
            s if s >= 0.75 => Color::Green,
            s if s >= 0.5 => Color::Yellow,
            _ => Color::Red,
        };
        self.colorize(&format!("{:.3}", score), color)
    }

    fn preview(&self, text: &str, limit: usize) -> String {
        if self.detailed || text.chars().count() <= limit {
            text.to_string()
        } else {
            let cut: String = text.chars().take(limit).collect();
            format!("{}...", cut)
        }
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_match(&self, result: &MatchResult) -> Result<String> {
        let mut output = self.format_header(&format!("CANDIDATES FOR JOB {}", result.job_id));

        if result.matches.is_empty() {
            output.push_str("No candidates with stored embeddings.\n");
        }
        for (rank, candidate) in result.matches.iter().enumerate() {
            output.push_str(&format!(
                "{:>2}. {} (resume #{}) score {}\n",
                rank + 1,
                candidate.filename,
                candidate.resume_id,
                self.format_score(candidate.similarity_score)
            ));
            if candidate.evidence.is_empty() {
                output.push_str(&format!("    {}\n", self.colorize("no overlapping sentences", Color::BrightBlack)));
            } else {
                output.push_str(&format!("    evidence: {}\n", self.preview(&candidate.evidence, 240)));
            }
        }

        if !result.missing_requirements.is_empty() {
            output.push_str(&self.format_header("REQUIREMENTS NOT COVERED"));
            for requirement in &result.missing_requirements {
                output.push_str(&format!("  {} {}\n", self.colorize("✗", Color::Red), requirement));
            }
        }

        Ok(output)
    }

    fn format_search(&self, query: &str, hits: &[SearchHit]) -> Result<String> {
        let mut output = self.format_header(&format!("RESULTS FOR \"{}\"", query));
        if hits.is_empty() {
            output.push_str("No matching resumes.\n");
        }
        for hit in hits {
            output.push_str(&format!(
                "- {} (resume #{}) score {}\n    {}\n",
                hit.filename,
                hit.resume_id,
                self.format_score(hit.similarity_score),
                self.preview(&hit.content.replace('\n', " "), 160)
            ));
        }
        Ok(output)
    }

    fn format_document(&self, document: &ProcessedDocument) -> Result<String> {
        let mut output = self.format_header(&document.filename);
        output.push_str(&format!(
            "Extracted {} characters, embedding of {} dimensions\n\n",
            document.content_text.chars().count(),
            document.embedding.len()
        ));
        output.push_str(&self.preview(&document.redacted_text, 600));
        output.push('\n');
        Ok(output)
    }

    fn format_archive(&self, report: &ArchiveReport) -> Result<String> {
        let mut output = String::new();
        for document in &report.processed {
            output.push_str(&self.format_document(document)?);
        }
        output.push_str(&self.format_header("ARCHIVE SUMMARY"));
        output.push_str(&format!(
            "{} processed, {} failed, {} skipped\n",
            report.processed.len(),
            report.failures.len(),
            report.skipped.len()
        ));
        for failure in &report.failures {
            output.push_str(&format!(
                "  {} {}: {}\n",
                self.colorize("✗", Color::Red),
                failure.filename,
                failure.reason
            ));
        }
        Ok(output)
    }
}

/// JSON formatter for API integration and structured data
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    results: &'a [SearchHit],
}

impl OutputFormatter for JsonFormatter {
    fn format_match(&self, result: &MatchResult) -> Result<String> {
        self.render(result)
    }

    fn format_search(&self, query: &str, hits: &[SearchHit]) -> Result<String> {
        self.render(&SearchOutput { query, results: hits })
    }

    fn format_document(&self, document: &ProcessedDocument) -> Result<String> {
        self.render(document)
    }

    fn format_archive(&self, report: &ArchiveReport) -> Result<String> {
        self.render(report)
    }
}
