//! Key/value storage abstraction.
//!
//! The quote store only needs `get`/`set` on string keys. Persistent data
//! goes through [`LocalStorage`](super::LocalStorage); session-scoped data
//! lives in [`SessionStorage`] and disappears with the process.

use std::collections::HashMap;

use crate::domain::Result;

/// Key holding the JSON array of quotes.
pub const QUOTES_KEY: &str = "quotes";

/// Key holding the last selected category filter.
pub const LAST_CATEGORY_KEY: &str = "lastCategory";

/// Key holding the last viewed quote (session scope).
pub const LAST_VIEWED_KEY: &str = "lastViewedQuote";

/// Key holding the serialized sync state.
pub const SYNC_STATE_KEY: &str = "syncState";

/// Minimal string key/value store.
pub trait KeyValueStore: Send {
    /// Read a value, `None` if the key is absent.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns error if the backend cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store for session-scoped values.
#[derive(Debug, Default)]
pub struct SessionStorage {
    values: HashMap<String, String>,
}

impl SessionStorage {
    /// Create an empty session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for SessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_storage_get_set() {
        let mut store = SessionStorage::new();
        assert_eq!(store.get(LAST_VIEWED_KEY).unwrap(), None);

        store.set(LAST_VIEWED_KEY, "one").unwrap();
        store.set(LAST_VIEWED_KEY, "two").unwrap();
        assert_eq!(store.get(LAST_VIEWED_KEY).unwrap().as_deref(), Some("two"));
    }
}
