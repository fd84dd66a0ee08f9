//! Output rendering
//!
//! Command results are printed as rounded tables, JSON, YAML or
//! borderless raw rows depending on `--format`. Status lines and
//! key/value summaries are always human-readable.

use crate::error::Result;
use crossterm::{
    style::{Color as CrosstermColor, Stylize},
    terminal::size,
};
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Padding, Style, Width},
    Table, Tabled,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
    Raw,
}

/// Table formatter with color support
pub struct TableFormatter {
    format: OutputFormat,
    no_color: bool,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        Self { format, no_color }
    }

    /// Render rows in the configured format
    pub fn format_table<T: Tabled + Serialize>(&self, data: &[T]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
            _ if data.is_empty() => Ok("No data to display".to_string()),
            OutputFormat::Table => Ok(self.format_as_table(data)),
            OutputFormat::Raw => Ok(self.format_as_raw(data)),
        }
    }

    /// Render a single item; tables get one row
    pub fn format_item<T: Tabled + Serialize>(&self, item: &T) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(item)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(item)?),
            _ => self.format_table(std::slice::from_ref(item)),
        }
    }

    /// Render a key/value summary; structured formats serialize `item` instead
    pub fn format_summary<T: Serialize>(&self, item: &T, pairs: &[(&str, &str)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(item)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(item)?),
            OutputFormat::Table => Ok(DisplayUtils::new(self.no_color).format_key_value_pairs(pairs)),
            OutputFormat::Raw => Ok(pairs
                .iter()
                .map(|(key, value)| format!("{key}\t{value}"))
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn format_as_table<T: Tabled>(&self, data: &[T]) -> String {
        let mut table = Table::new(data);

        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .with(Padding::new(1, 1, 0, 0));

        if !self.no_color {
            table.with(Modify::new(Rows::first()).with(Color::FG_BLUE));
        }

        if let Ok((width, _)) = size() {
            table.with(Width::wrap(width as usize));
        }

        table.to_string()
    }

    fn format_as_raw<T: Tabled>(&self, data: &[T]) -> String {
        let mut table = Table::new(data);
        table.with(Style::empty());
        table.to_string()
    }
}

/// Kind of status line printed by `DisplayUtils`
#[derive(Debug, Clone, Copy)]
enum Status {
    Success,
    Warning,
    Info,
}

impl Status {
    fn marker(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Warning => "⚠",
            Status::Info => "ℹ",
        }
    }

    fn color(self) -> CrosstermColor {
        match self {
            Status::Success => CrosstermColor::Green,
            Status::Warning => CrosstermColor::Yellow,
            Status::Info => CrosstermColor::Cyan,
        }
    }
}

/// Human-facing status lines and key/value blocks
pub struct DisplayUtils {
    no_color: bool,
}

impl DisplayUtils {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    fn status_line(&self, status: Status, message: &str) -> String {
        if self.no_color {
            format!("{} {}", status.marker(), message)
        } else {
            format!("{} {}", status.marker(), message.with(status.color()))
        }
    }

    pub fn print_header(&self, title: &str) -> Result<()> {
        let title = if self.no_color {
            title.to_string()
        } else {
            title.with(CrosstermColor::Blue).bold().to_string()
        };
        println!("=== {title} ===");
        Ok(())
    }

    pub fn print_success(&self, message: &str) -> Result<()> {
        println!("{}", self.status_line(Status::Success, message));
        Ok(())
    }

    /// Printed to stdout alongside the command's other output
    pub fn print_warning(&self, message: &str) -> Result<()> {
        println!("{}", self.status_line(Status::Warning, message));
        Ok(())
    }

    pub fn print_info(&self, message: &str) -> Result<()> {
        println!("{}", self.status_line(Status::Info, message));
        Ok(())
    }

    /// Keys padded to a common width, one `key: value` per line
    pub fn format_key_value_pairs(&self, pairs: &[(&str, &str)]) -> String {
        let width = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);

        let lines: Vec<String> = pairs
            .iter()
            .map(|(key, value)| {
                let key = format!("{key:width$}");
                if self.no_color {
                    format!("{key}: {value}")
                } else {
                    format!("{}: {value}", key.with(CrosstermColor::Magenta).bold())
                }
            })
            .collect();
        lines.join("\n")
    }
}
