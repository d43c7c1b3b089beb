//! The quote store.
//!
//! Owns the in-memory collection, persists it after every mutation, answers
//! filtered and random queries, and applies server snapshots.

use rand::seq::SliceRandom;
use tokio::sync::broadcast;

use crate::domain::{
    seed_quotes, AppError, CategoryFilter, ImportReport, Quote, ReconcileOutcome, RejectedRecord,
    Result, SyncNotice, SyncState, ALL_CATEGORIES,
};
use crate::infrastructure::key_value::{
    KeyValueStore, LAST_CATEGORY_KEY, LAST_VIEWED_KEY, QUOTES_KEY, SYNC_STATE_KEY,
};
use crate::infrastructure::SessionStorage;

const EVENT_CAPACITY: usize = 32;

/// Change notifications published by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The collection was mutated.
    CollectionChanged { len: usize },
    /// Server data replaced local data.
    Notice(SyncNotice),
}

/// Quote collection bound to a persistent store and a session store.
pub struct QuoteStore<S: KeyValueStore> {
    quotes: Vec<Quote>,
    storage: S,
    session: SessionStorage,
    events: broadcast::Sender<StoreEvent>,
}

impl<S: KeyValueStore> QuoteStore<S> {
    /// Load quotes from `storage`, falling back to the seed set.
    ///
    /// Missing or malformed persisted data yields the seed quotes. Only a
    /// failing storage backend is an error.
    ///
    /// # Errors
    /// Returns error if the storage backend cannot be read.
    pub fn initialize(storage: S) -> Result<Self> {
        let quotes = match storage.get(QUOTES_KEY)? {
            Some(raw) => parse_persisted(&raw).unwrap_or_else(|reason| {
                tracing::warn!(%reason, "Stored quotes are unusable, using seed quotes");
                seed_quotes()
            }),
            None => seed_quotes(),
        };

        tracing::debug!(count = quotes.len(), "Quote store initialized");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            quotes,
            storage,
            session: SessionStorage::new(),
            events,
        })
    }

    /// Receive change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// All quotes in insertion order.
    #[must_use]
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    /// Number of quotes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Add a quote after validation, then persist.
    ///
    /// # Errors
    /// Returns a validation error (and changes nothing) if either field is
    /// blank, or a storage error if persisting fails.
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote> {
        let quote = Quote::new(text, category)?;

        let mut next = self.quotes.clone();
        next.push(quote.clone());
        self.commit(next)?;

        tracing::info!(category = %quote.category, total = self.quotes.len(), "Quote added");

        Ok(quote)
    }

    /// `"all"` followed by each distinct category in first-seen order.
    #[must_use]
    pub fn all_categories(&self) -> Vec<String> {
        let mut categories = vec![ALL_CATEGORIES.to_string()];
        for quote in &self.quotes {
            if !categories.contains(&quote.category) {
                categories.push(quote.category.clone());
            }
        }
        categories
    }

    /// Quotes in scope for `filter`, in collection order.
    #[must_use]
    pub fn filtered(&self, filter: &CategoryFilter) -> Vec<&Quote> {
        self.quotes.iter().filter(|q| q.matches(filter)).collect()
    }

    /// First quote in scope, if any.
    #[must_use]
    pub fn first_in_scope(&self, filter: &CategoryFilter) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.matches(filter))
    }

    /// Pick a random quote in scope and remember it as last viewed.
    ///
    /// Returns `None` when no quote is in scope; the session is untouched.
    ///
    /// # Errors
    /// Returns error if the session value cannot be serialized.
    pub fn show_random(&mut self, filter: &CategoryFilter) -> Result<Option<Quote>> {
        let picked = pick_random(&self.filtered(filter)).map(|q| (*q).clone());

        if let Some(quote) = &picked {
            let raw = serde_json::to_string(quote).map_err(AppError::json_parse)?;
            self.session.set(LAST_VIEWED_KEY, &raw)?;
        }

        Ok(picked)
    }

    /// Last quote returned by [`show_random`](Self::show_random) this session.
    #[must_use]
    pub fn last_viewed(&self) -> Option<Quote> {
        self.session
            .get(LAST_VIEWED_KEY)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    /// Effective category filter.
    ///
    /// A persisted category that no longer exists in the collection falls
    /// back to `all`.
    ///
    /// # Errors
    /// Returns error if the storage backend cannot be read.
    pub fn current_filter(&self) -> Result<CategoryFilter> {
        let stored = self.storage.get(LAST_CATEGORY_KEY)?;
        let filter = CategoryFilter::from_option(stored.as_deref());

        Ok(match filter {
            CategoryFilter::Category(ref c) if !self.quotes.iter().any(|q| q.category == *c) => {
                CategoryFilter::All
            }
            other => other,
        })
    }

    /// Remember `filter` as the last selected category.
    ///
    /// # Errors
    /// Returns error if the storage backend cannot be written.
    pub fn set_filter(&mut self, filter: &CategoryFilter) -> Result<()> {
        self.storage.set(LAST_CATEGORY_KEY, filter.as_str())
    }

    /// Write the full collection to persistent storage.
    ///
    /// # Errors
    /// Returns error if serialization or the storage write fails.
    pub fn persist(&mut self) -> Result<()> {
        persist_quotes(&mut self.storage, &self.quotes)
    }

    /// Persist `next` and only then make it the live collection.
    fn commit(&mut self, next: Vec<Quote>) -> Result<()> {
        persist_quotes(&mut self.storage, &next)?;
        self.quotes = next;
        self.notify_changed();
        Ok(())
    }

    /// Pretty-printed JSON array of the collection.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.quotes).map_err(AppError::json_parse)
    }

    /// Append every valid record of a JSON array.
    ///
    /// Invalid records are skipped and listed in the report. Nothing is
    /// appended when the payload is not a JSON array.
    ///
    /// # Errors
    /// Returns a format error if `raw` is not a JSON array, or a storage
    /// error if persisting fails.
    pub fn import_batch(&mut self, raw: &str) -> Result<ImportReport> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| AppError::format("import payload is not valid JSON", Some(e)))?;

        let serde_json::Value::Array(records) = value else {
            return Err(AppError::format(
                "import payload must be a JSON array of quotes",
                None,
            ));
        };

        let mut report = ImportReport::default();
        let mut next = self.quotes.clone();
        for (index, record) in records.iter().enumerate() {
            match Quote::from_record(record) {
                Ok(quote) => {
                    next.push(quote);
                    report.accepted += 1;
                }
                Err(reason) => report.rejected.push(RejectedRecord { index, reason }),
            }
        }

        if report.accepted > 0 {
            self.commit(next)?;
        }

        tracing::info!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            "Import completed"
        );

        Ok(report)
    }

    /// Apply a remote snapshot: any difference means the server wins.
    ///
    /// Local quotes not present on the server are discarded.
    ///
    /// # Errors
    /// Returns error if persisting the replacement fails.
    pub fn reconcile(&mut self, remote: Vec<Quote>) -> Result<ReconcileOutcome> {
        if remote == self.quotes {
            tracing::debug!(count = remote.len(), "Remote snapshot unchanged");
            return Ok(ReconcileOutcome::Unchanged);
        }

        let notice = SyncNotice::replaced(self.quotes.len(), remote.len());
        self.commit(remote)?;

        tracing::info!(count = self.quotes.len(), "Local quotes replaced by server snapshot");

        let _ = self.events.send(StoreEvent::Notice(notice.clone()));

        Ok(ReconcileOutcome::Replaced(notice))
    }

    /// Last persisted sync state.
    ///
    /// # Errors
    /// Returns error if the storage backend cannot be read.
    pub fn sync_state(&self) -> Result<SyncState> {
        Ok(self
            .storage
            .get(SYNC_STATE_KEY)?
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default())
    }

    /// Persist the sync state.
    ///
    /// # Errors
    /// Returns error if serialization or the storage write fails.
    pub fn record_sync_state(&mut self, state: &SyncState) -> Result<()> {
        let raw = serde_json::to_string(state).map_err(AppError::json_parse)?;
        self.storage.set(SYNC_STATE_KEY, &raw)
    }

    fn notify_changed(&self) {
        let _ = self.events.send(StoreEvent::CollectionChanged {
            len: self.quotes.len(),
        });
    }
}

/// Uniformly pick one element, `None` for an empty slice.
pub fn pick_random<T>(items: &[T]) -> Option<&T> {
    items.choose(&mut rand::thread_rng())
}

fn persist_quotes<S: KeyValueStore>(storage: &mut S, quotes: &[Quote]) -> Result<()> {
    let raw = serde_json::to_string(quotes).map_err(AppError::json_parse)?;
    storage.set(QUOTES_KEY, &raw)
}

/// Parse persisted quotes, requiring every element to be a valid quote.
fn parse_persisted(raw: &str) -> std::result::Result<Vec<Quote>, String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let serde_json::Value::Array(records) = value else {
        return Err("stored quotes are not a JSON array".to_string());
    };

    records
        .iter()
        .enumerate()
        .map(|(i, r)| Quote::from_record(r).map_err(|reason| format!("record {i}: {reason}")))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infrastructure::LocalStorage;

    /// In-memory store that counts writes per key.
    #[derive(Default)]
    pub(crate) struct CountingStore {
        inner: SessionStorage,
        pub(crate) writes: usize,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if key == QUOTES_KEY {
                self.writes += 1;
            }
            self.inner.set(key, value)
        }
    }

    impl CountingStore {
        pub(crate) fn with_quotes(raw: &str) -> Self {
            let mut store = Self::default();
            store.inner.set(QUOTES_KEY, raw).unwrap();
            store
        }
    }

    /// Store whose writes fail while `fail_writes` is set.
    struct FlakyStore {
        inner: SessionStorage,
        fail_writes: bool,
    }

    impl FlakyStore {
        fn failing() -> Self {
            Self {
                inner: SessionStorage::new(),
                fail_writes: true,
            }
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes {
                return Err(AppError::database(rusqlite::Error::InvalidQuery));
            }
            self.inner.set(key, value)
        }
    }

    fn q(text: &str, category: &str) -> Quote {
        Quote::new(text, category).unwrap()
    }

    fn store_with(quotes: &[Quote]) -> QuoteStore<CountingStore> {
        let raw = serde_json::to_string(quotes).unwrap();
        QuoteStore::initialize(CountingStore::with_quotes(&raw)).unwrap()
    }

    #[test]
    fn test_initialize_empty_storage_uses_seed() {
        let store = QuoteStore::initialize(CountingStore::default()).unwrap();
        assert_eq!(store.quotes(), seed_quotes().as_slice());
        assert_eq!(store.storage.writes, 0);
    }

    #[test]
    fn test_initialize_malformed_storage_uses_seed() {
        for raw in ["{not json", r#"{"text":"x"}"#, r#"[{"text":"","category":"c"}]"#] {
            let store = QuoteStore::initialize(CountingStore::with_quotes(raw)).unwrap();
            assert_eq!(store.quotes(), seed_quotes().as_slice(), "payload: {raw}");
        }
    }

    #[test]
    fn test_initialize_loads_persisted() {
        let store = store_with(&[q("a", "X")]);
        assert_eq!(store.quotes(), &[q("a", "X")]);
    }

    #[test]
    fn test_add_appends_and_persists() {
        let mut store = store_with(&[q("a", "X")]);
        let mut events = store.subscribe();

        let added = store.add("  b  ", " Y ").unwrap();

        assert_eq!(added, q("b", "Y"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.quotes().last(), Some(&q("b", "Y")));
        assert_eq!(store.storage.writes, 1);
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::CollectionChanged { len: 2 }
        );
    }

    #[test]
    fn test_add_rejects_blank_fields() {
        let mut store = store_with(&[q("a", "X")]);

        for (text, category) in [("", "Y"), ("b", ""), ("   ", "Y"), ("b", "\t")] {
            let err = store.add(text, category).unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.storage.writes, 0);
    }

    #[test]
    fn test_all_categories_first_seen_order() {
        let store = store_with(&[
            q("1", "Life"),
            q("2", "Code"),
            q("3", "Life"),
            q("4", "all"),
            q("5", "Art"),
        ]);

        assert_eq!(store.all_categories(), vec!["all", "Life", "Code", "Art"]);
    }

    #[test]
    fn test_all_categories_empty_collection() {
        let store = store_with(&[]);
        assert_eq!(store.all_categories(), vec!["all"]);
    }

    #[test]
    fn test_filtered() {
        let quotes = [q("1", "Life"), q("2", "Code"), q("3", "Life")];
        let store = store_with(&quotes);

        let all: Vec<Quote> = store.filtered(&CategoryFilter::All).into_iter().cloned().collect();
        assert_eq!(all, quotes);

        let life = store.filtered(&CategoryFilter::Category("Life".into()));
        assert_eq!(life, vec![&quotes[0], &quotes[2]]);

        assert!(store
            .filtered(&CategoryFilter::Category("Nope".into()))
            .is_empty());
        assert_eq!(
            store.first_in_scope(&CategoryFilter::Category("Code".into())),
            Some(&quotes[1])
        );
    }

    #[test]
    fn test_pick_random_membership() {
        let items = [1, 2, 3, 4];
        for _ in 0..50 {
            assert!(items.contains(pick_random(&items).unwrap()));
        }

        let empty: [u8; 0] = [];
        assert!(pick_random(&empty).is_none());
    }

    #[test]
    fn test_show_random_records_last_viewed() {
        let mut store = store_with(&[q("1", "Life"), q("2", "Code")]);
        assert!(store.last_viewed().is_none());

        let picked = store
            .show_random(&CategoryFilter::Category("Code".into()))
            .unwrap();
        assert_eq!(picked, Some(q("2", "Code")));
        assert_eq!(store.last_viewed(), Some(q("2", "Code")));

        let none = store
            .show_random(&CategoryFilter::Category("Missing".into()))
            .unwrap();
        assert!(none.is_none());
        assert_eq!(store.last_viewed(), Some(q("2", "Code")));
    }

    #[test]
    fn test_filter_roundtrip_and_fallback() {
        let mut store = store_with(&[q("1", "Life")]);
        assert_eq!(store.current_filter().unwrap(), CategoryFilter::All);

        let life = CategoryFilter::Category("Life".into());
        store.set_filter(&life).unwrap();
        assert_eq!(store.current_filter().unwrap(), life);

        store
            .set_filter(&CategoryFilter::Category("Gone".into()))
            .unwrap();
        assert_eq!(store.current_filter().unwrap(), CategoryFilter::All);
    }

    #[test]
    fn test_import_rejects_non_array() {
        let mut store = store_with(&[q("a", "X")]);

        for raw in [r#"{"text":"x"}"#, "42", "not json"] {
            let err = store.import_batch(raw).unwrap_err();
            assert!(matches!(err, AppError::Format { .. }), "payload: {raw}");
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.storage.writes, 0);
    }

    #[test]
    fn test_import_appends_valid_and_reports_rejected() {
        let mut store = store_with(&[q("a", "X")]);

        let report = store
            .import_batch(
                r#"[
                    {"text": "b", "category": "Y"},
                    {"text": "", "category": "Y"},
                    "oops",
                    {"text": "c", "category": "Z"}
                ]"#,
            )
            .unwrap();

        assert_eq!(report.accepted, 2);
        assert_eq!(
            report.rejected.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(!report.is_clean());
        assert_eq!(store.quotes(), &[q("a", "X"), q("b", "Y"), q("c", "Z")]);
        assert_eq!(store.storage.writes, 1);
    }

    #[test]
    fn test_import_keeps_duplicates() {
        let mut store = store_with(&[q("a", "X")]);
        store.import_batch(r#"[{"text":"a","category":"X"}]"#).unwrap();
        assert_eq!(store.quotes(), &[q("a", "X"), q("a", "X")]);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let original = [q("t1", "c1"), q("t2", "c2")];
        let exported = store_with(&original).export_json().unwrap();
        assert!(exported.contains("\n  {"));

        let mut empty = store_with(&[]);
        empty.import_batch(&exported).unwrap();
        assert_eq!(empty.quotes(), &original);

        let mut non_empty = store_with(&original);
        non_empty.import_batch(&exported).unwrap();
        assert_eq!(non_empty.len(), 4);
    }

    #[test]
    fn test_reconcile_identical_is_noop() {
        let mut store = store_with(&[q("a", "X")]);
        let mut events = store.subscribe();

        let outcome = store.reconcile(vec![q("a", "X")]).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(store.storage.writes, 0);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_reconcile_server_wins() {
        let mut store = store_with(&[q("a", "X")]);
        let mut events = store.subscribe();

        let outcome = store.reconcile(vec![q("b", "Y")]).unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Replaced(_)));
        assert_eq!(store.quotes(), &[q("b", "Y")]);
        assert_eq!(store.storage.writes, 1);

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::CollectionChanged { len: 1 }
        );
        let notices: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|e| matches!(e, StoreEvent::Notice(_)))
            .collect();
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_reconcile_order_matters() {
        let mut store = store_with(&[q("a", "X"), q("b", "Y")]);
        let outcome = store.reconcile(vec![q("b", "Y"), q("a", "X")]).unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Replaced(_)));
    }

    #[test]
    fn test_persisted_state_survives_reinitialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.db");

        {
            let mut store = QuoteStore::initialize(LocalStorage::open(&path).unwrap()).unwrap();
            store.add("Persist me", "Tests").unwrap();
            store
                .set_filter(&CategoryFilter::Category("Tests".into()))
                .unwrap();
        }

        let store = QuoteStore::initialize(LocalStorage::open(&path).unwrap()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.current_filter().unwrap(),
            CategoryFilter::Category("Tests".into())
        );
        assert!(store.last_viewed().is_none());
    }

    #[test]
    fn test_sync_state_roundtrip() {
        let mut store = store_with(&[]);
        assert_eq!(store.sync_state().unwrap().attempts, 0);

        let state = SyncState::default().syncing().completed(true);
        store.record_sync_state(&state).unwrap();

        let loaded = store.sync_state().unwrap();
        assert_eq!(loaded.replacements, 1);
        assert!(loaded.last_sync.is_some());
    }

    #[test]
    fn test_failed_write_keeps_last_known_good_collection() {
        let mut store = QuoteStore::initialize(FlakyStore::failing()).unwrap();
        let mut events = store.subscribe();

        assert!(matches!(
            store.add("x", "y"),
            Err(AppError::Database { .. })
        ));
        assert_eq!(store.quotes(), seed_quotes().as_slice());

        assert!(store
            .import_batch(r#"[{"text":"b","category":"Y"}]"#)
            .is_err());
        assert_eq!(store.quotes(), seed_quotes().as_slice());

        assert!(store.reconcile(vec![q("b", "Y")]).is_err());
        assert_eq!(store.quotes(), seed_quotes().as_slice());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_reconcile_retries_after_failed_write() {
        let mut store = QuoteStore::initialize(FlakyStore::failing()).unwrap();
        assert!(store.reconcile(vec![q("b", "Y")]).is_err());

        store.storage.fail_writes = false;
        let outcome = store.reconcile(vec![q("b", "Y")]).unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Replaced(_)));
        assert_eq!(
            store.storage.get(QUOTES_KEY).unwrap().as_deref(),
            Some(r#"[{"text":"b","category":"Y"}]"#)
        );
    }
}
