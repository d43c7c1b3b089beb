//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;

/// Quote Sync - store, filter, and sync short quotes.
#[derive(Parser, Debug)]
#[command(name = "quotes")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format: text, json, or table.
    #[arg(short, long, global = true, default_value = "text")]
    pub format: String,

    /// Data directory (defaults to ~/.quote-sync).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the first quote in the selected category.
    Show {
        /// Category to select ("all" for every quote); remembered for next time.
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show a random quote from the selected category.
    Random {
        /// Category to pick from (defaults to the last selected one).
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List quotes in the selected category.
    List {
        /// Category to list; remembered for next time.
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List all categories.
    Categories,

    /// Add a new quote.
    Add {
        /// Quote text.
        text: String,

        /// Quote category.
        category: String,

        /// Do not post the quote to the server.
        #[arg(long)]
        no_push: bool,
    },

    /// Export all quotes as JSON.
    Export {
        /// Output file path.
        #[arg(short, long, default_value = crate::application::DEFAULT_EXPORT_FILE)]
        output: PathBuf,
    },

    /// Import quotes from a JSON file (appends).
    Import {
        /// JSON file containing an array of quotes.
        file: PathBuf,
    },

    /// Sync once with the server (server data wins).
    Sync,

    /// Keep syncing on an interval until interrupted.
    Watch {
        /// Seconds between syncs (defaults to the configured interval).
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show sync status.
    Status,

    /// Show or update configuration.
    Config {
        /// Write a commented default config file if none exists.
        #[arg(long)]
        init: bool,

        /// Set the sync interval in seconds.
        #[arg(long)]
        interval: Option<u64>,

        /// Set the remote endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Show the paths being used.
    Paths,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from(["quotes", "add", "Hello", "Greetings", "--no-push"]).unwrap();
        match cli.command {
            Commands::Add {
                text,
                category,
                no_push,
            } => {
                assert_eq!(text, "Hello");
                assert_eq!(category, "Greetings");
                assert!(no_push);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_export_default_file() {
        let cli = Cli::try_parse_from(["quotes", "export"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export { ref output } if output == &PathBuf::from("quotes.json")
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["quotes", "list", "-c", "Programming", "-f", "table", "-vv"])
            .unwrap();

        assert_eq!(cli.output_format(), Ok(OutputFormat::Table));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::List { category: Some(ref c) } if c == "Programming"
        ));
    }
}
