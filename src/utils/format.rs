//! Table formatting and output utilities
//!
//! Renders introspection rows as a styled table, plain text or JSON, and
//! prints success lines with optional color.

use crate::error::Result;
use clap::ValueEnum;
use crossterm::{style::Color as CrosstermColor, style::Stylize, terminal::size};
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Padding, Style, Width},
    Table, Tabled,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Raw,
}

/// Color theme for console output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: CrosstermColor,
    pub accent: CrosstermColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: CrosstermColor::Green,
            accent: CrosstermColor::Magenta,
        }
    }
}

/// Table formatter with color support
pub struct TableFormatter {
    format: OutputFormat,
    no_color: bool,
}

impl TableFormatter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        Self { format, no_color }
    }

    pub fn format_table<T: Tabled + Serialize>(&self, data: &[T]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
            _ if data.is_empty() => Ok("No data to display".to_string()),
            OutputFormat::Table => Ok(self.format_as_table(data)),
            OutputFormat::Raw => Ok(Self::format_as_raw(data)),
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

        // Auto-adjust width to terminal
        if let Ok((width, _)) = size() {
            table.with(Width::wrap(width as usize));
        }

        table.to_string()
    }

    fn format_as_raw<T: Tabled>(data: &[T]) -> String {
        let mut table = Table::new(data);
        table.with(Style::empty());
        table.to_string()
    }
}

/// Status line printing
pub struct DisplayUtils {
    theme: ColorTheme,
    no_color: bool,
}

impl DisplayUtils {
    pub fn new(no_color: bool) -> Self {
        Self {
            theme: ColorTheme::default(),
            no_color,
        }
    }

    fn styled(&self, symbol: &str, message: &str, color: CrosstermColor) -> String {
        if self.no_color {
            format!("{symbol} {message}")
        } else {
            format!("{symbol} {}", message.with(color))
        }
    }

    pub fn print_success(&self, message: &str) {
        println!("{}", self.styled("✓", message, self.theme.success));
    }

    /// Align `key: value` lines on the longest key.
    pub fn format_key_value_pairs(&self, pairs: &[(&str, &str)]) -> String {
        let max_key_length = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);

        pairs
            .iter()
            .map(|(key, value)| {
                let padded = format!("{key:max_key_length$}");
                if self.no_color {
                    format!("{padded}: {value}")
                } else {
                    format!("{}: {value}", padded.with(self.theme.accent).bold())
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
