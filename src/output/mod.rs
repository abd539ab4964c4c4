//! Result rendering for the command line

pub mod formatter;

pub use formatter::{formatter_for, OutputFormat, OutputFormatter};
