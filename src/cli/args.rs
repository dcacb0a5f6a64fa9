// src/cli/args.rs

use crate::constants::{DEFAULT_INDENT, FLOW_TAG_COUNT, MAX_INDENT, MIN_INDENT};
use crate::core::formatter::FormatOptions;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output encoding for `render`.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Reads a project file and prints it in canonical form."
)]
pub struct RenderArgs {
    /// The project file to read (`.json` is read as JSON, anything else as YAML).
    pub file: PathBuf,

    /// The output encoding.
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Spaces per nesting level in YAML output.
    #[arg(long, default_value_t = DEFAULT_INDENT, value_parser = parse_indent)]
    pub indent: usize,

    /// Largest `tags` list written on a single line.
    #[arg(long, default_value_t = FLOW_TAG_COUNT)]
    pub flow_tag_count: usize,

    /// Pretty-print JSON output.
    #[arg(long)]
    pub pretty: bool,
}

impl RenderArgs {
    /// The formatting options selected by the flags.
    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            indent: self.indent,
            flow_tag_count: self.flow_tag_count,
        }
    }
}

fn parse_indent(raw: &str) -> Result<usize, String> {
    let indent: usize = raw
        .parse()
        .map_err(|_| format!("'{}' is not a whole number", raw))?;
    if (MIN_INDENT..=MAX_INDENT).contains(&indent) {
        Ok(indent)
    } else {
        Err(format!("must be between {} and {}", MIN_INDENT, MAX_INDENT))
    }
}

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Reads a project file and checks it for invalid commands and duplicate names."
)]
pub struct CheckArgs {
    /// The project file to check.
    pub file: PathBuf,
}
