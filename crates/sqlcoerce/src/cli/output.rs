//! Output formatting utilities

use crate::syntax::ExprError;
use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde_json::Value as JsonValue;
use sqlcoerce_diagnostics::CastError;
use std::io::IsTerminal;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Machine-readable JSON
    Json,
    /// Human-readable text and tables
    #[default]
    Pretty,
}

/// When to colorize output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

/// Set up color output based on user preference
pub fn setup_colors(choice: ColorChoice) {
    let enabled = match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal(),
    };
    colored::control::set_override(enabled);
}

/// Format an error for display; cast errors render as diagnostics
pub fn format_error(error: &anyhow::Error) -> String {
    let cast = error
        .downcast_ref::<CastError>()
        .or_else(|| match error.downcast_ref::<ExprError>() {
            Some(ExprError::Cast(cast)) => Some(cast),
            _ => None,
        });
    match cast {
        Some(cast) => cast.to_diagnostic().render_colored(),
        None => format!("{} {error:#}", "Error:".red().bold()),
    }
}

/// Format a success message for display
pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Print a JSON document, pretty-printed
pub fn print_json(value: &JsonValue) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    println!("{text}");
    Ok(())
}

/// Render rows with the shared table style
pub fn table<T: Tabled>(rows: impl IntoIterator<Item = T>) -> String {
    Table::new(rows).with(Style::modern()).to_string()
}
