//! Domain layer - core types and rules.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (DB, IO, network).

pub mod error;
pub mod models;
pub mod sync;

pub use error::{AppError, Result};
pub use models::{
    seed_quotes, CategoryFilter, ImportReport, Quote, ReconcileOutcome, RejectedRecord,
    SyncNotice, ALL_CATEGORIES, SERVER_CATEGORY,
};
pub use sync::{AppConfig, SyncConfig, SyncState};
