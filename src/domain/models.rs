//! Domain models for quote data.
//!
//! These models represent the quotes held by the store and the outcomes of
//! the operations that mutate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};

/// Sentinel filter value meaning "every category".
pub const ALL_CATEGORIES: &str = "all";

/// Category assigned to every quote fetched from the remote endpoint.
pub const SERVER_CATEGORY: &str = "Server";

/// A single quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    /// The quote text.
    pub text: String,
    /// Free-form category label.
    pub category: String,
}

impl Quote {
    /// Create a validated quote, trimming both fields.
    ///
    /// # Errors
    /// Returns a validation error if either field is empty after trimming.
    pub fn new(text: &str, category: &str) -> Result<Self> {
        let text = text.trim();
        let category = category.trim();

        if text.is_empty() {
            return Err(AppError::validation("quote text must not be empty"));
        }
        if category.is_empty() {
            return Err(AppError::validation("quote category must not be empty"));
        }

        Ok(Self {
            text: text.to_string(),
            category: category.to_string(),
        })
    }

    /// Validate an arbitrary JSON record against the quote invariants.
    ///
    /// # Errors
    /// Returns a description of the first violated invariant.
    pub fn from_record(value: &serde_json::Value) -> std::result::Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "record is not an object".to_string())?;

        let text = string_field(obj, "text")?;
        let category = string_field(obj, "category")?;

        Self::new(text, category).map_err(|e| match e {
            AppError::Validation { message } => message,
            other => other.to_string(),
        })
    }

    /// Whether this quote belongs to the given filter.
    #[must_use]
    pub fn matches(&self, filter: &CategoryFilter) -> bool {
        match filter {
            CategoryFilter::All => true,
            CategoryFilter::Category(c) => self.category == *c,
        }
    }
}

fn string_field<'a>(
    obj: &'a serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> std::result::Result<&'a str, String> {
    obj.get(name)
        .ok_or_else(|| format!("missing field `{name}`"))?
        .as_str()
        .ok_or_else(|| format!("field `{name}` is not a string"))
}

/// The fixed set of quotes used when nothing valid is persisted.
#[must_use]
pub fn seed_quotes() -> Vec<Quote> {
    vec![
        Quote {
            text: "Learning never exhausts the mind.".into(),
            category: "Education".into(),
        },
        Quote {
            text: "Code is poetry.".into(),
            category: "Programming".into(),
        },
    ]
}

/// Last-selected category filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Every quote is in scope.
    #[default]
    All,
    /// Only quotes with exactly this category.
    Category(String),
}

impl CategoryFilter {
    /// Build a filter from an optional CLI/config value.
    #[must_use]
    pub fn from_option(value: Option<&str>) -> Self {
        value.map_or(Self::All, |v| v.parse().unwrap_or_default())
    }

    /// Storage/display form of the filter.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Category(c) => c,
        }
    }
}

impl std::str::FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == ALL_CATEGORIES {
            Ok(Self::All)
        } else {
            Ok(Self::Category(s.to_string()))
        }
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record rejected during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    /// Zero-based position in the imported array.
    pub index: usize,
    /// Why the record was rejected.
    pub reason: String,
}

/// Summary of an import batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Number of records appended to the collection.
    pub accepted: usize,
    /// Records that failed validation.
    pub rejected: Vec<RejectedRecord>,
}

impl ImportReport {
    /// Whether every record was accepted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Human-readable notice emitted when remote data replaced local data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncNotice {
    /// Message shown to the user.
    pub message: String,
    /// When the replacement happened.
    pub at: DateTime<Utc>,
}

impl SyncNotice {
    /// Notice for a server-wins replacement.
    #[must_use]
    pub fn replaced(local_len: usize, remote_len: usize) -> Self {
        Self {
            message: format!(
                "Quotes synced with server: {local_len} local quote(s) replaced by {remote_len} from server."
            ),
            at: Utc::now(),
        }
    }
}

/// Result of reconciling local quotes with a remote snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Remote snapshot was identical; nothing changed.
    Unchanged,
    /// Local collection was replaced by the remote snapshot.
    Replaced(SyncNotice),
}
