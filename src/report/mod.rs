//! Report generation.

pub mod generator;

pub use generator::{generate_json_report, write_markdown_report, ReportOptions};
