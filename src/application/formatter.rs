//! Output formatting for quotes.
//!
//! Supports multiple output formats: plain text, JSON, and table view.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{CategoryFilter, ImportReport, Quote, SyncState};

use super::sync_service::SyncOutcome;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format for programmatic use.
    Json,
    /// Compact table listing.
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => Err(format!("Unknown format: {s}. Use: text, json, table")),
        }
    }
}

/// Formats a single quote for display.
pub fn format_quote(quote: &Quote) -> String {
    format!("“{}”\n  {}", quote.text, format!("[{}]", quote.category).dimmed())
}

/// Formats quotes in the requested output format.
///
/// # Errors
/// Returns error if JSON serialization fails.
pub fn format_quotes(quotes: &[&Quote], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(quotes
            .iter()
            .map(|q| format_quote(q))
            .collect::<Vec<_>>()
            .join("\n\n")),
        OutputFormat::Json => serde_json::to_string_pretty(quotes),
        OutputFormat::Table => Ok(format_quotes_table(quotes)),
    }
}

/// Formats a table listing of quotes.
pub fn format_quotes_table(quotes: &[&Quote]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Category", "Quote"]);

    for (i, quote) in quotes.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            truncate(&quote.category, 18),
            truncate(&quote.text, 60),
        ]);
    }

    table.to_string()
}

/// Formats the category list, marking the active filter.
pub fn format_categories(categories: &[String], active: &CategoryFilter) -> String {
    categories
        .iter()
        .map(|c| {
            if c == active.as_str() {
                format!("{} {}", "*".green().bold(), c.green())
            } else {
                format!("  {c}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats an import report.
pub fn format_import_report(report: &ImportReport) -> String {
    let mut out = format!(
        "{} Imported {} quote(s)",
        "✓".green().bold(),
        report.accepted
    );

    if !report.is_clean() {
        out.push_str(&format!(
            "\n{} Rejected {} record(s):",
            "!".yellow().bold(),
            report.rejected.len()
        ));
        for rejected in &report.rejected {
            out.push_str(&format!("\n  #{}: {}", rejected.index, rejected.reason));
        }
    }

    out
}

/// Formats the outcome of a sync cycle.
pub fn format_sync_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Unchanged => format!("{} Quotes already up to date", "✓".green()),
        SyncOutcome::Replaced(notice) => format!("{} {}", "⟳".yellow().bold(), notice.message),
        SyncOutcome::Skipped { reason } => {
            format!("{} Sync skipped: {}", "!".red().bold(), reason)
        }
    }
}

/// Formats sync state for display.
pub fn format_sync_state(state: &SyncState, total_quotes: usize) -> String {
    let last_sync = state.last_sync.map_or_else(
        || "never".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    let mut out = format!(
        "{}\n  Quotes: {}\n  Last sync: {}\n  Attempts: {}\n  Replacements: {}",
        "📊 Sync status".bold(),
        total_quotes.to_string().cyan(),
        last_sync.cyan(),
        state.attempts.to_string().cyan(),
        state.replacements.to_string().yellow()
    );

    if state.is_syncing {
        out.push_str(&format!("\n  {}", "Sync in progress".yellow()));
    }

    if let Some(err) = &state.last_error {
        out.push_str(&format!("\n  Last error: {}", err.red()));
    }

    out
}

/// Truncates a string to max length (in chars) with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
