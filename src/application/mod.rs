//! Application layer - use cases and orchestration.
//!
//! This layer contains the quote store, its synchronization with the
//! remote endpoint, file transfer, and output formatting.

pub mod formatter;
pub mod quote_store;
pub mod sync_service;
pub mod transfer;

pub use formatter::{
    format_categories, format_import_report, format_quote, format_quotes, format_sync_outcome,
    format_sync_state, OutputFormat,
};
pub use quote_store::{QuoteStore, StoreEvent};
pub use sync_service::SyncService;
pub use transfer::{export_to_file, import_from_file, DEFAULT_EXPORT_FILE};
