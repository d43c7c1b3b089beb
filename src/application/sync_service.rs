//! Synchronization service for quote data.
//!
//! Fetches the remote snapshot with a bounded timeout and hands it to the
//! store's server-wins reconciliation. Fetch failures are logged and treated
//! as "no snapshot available". Also replicates new quotes to the server and
//! drives the recurring poll.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::{Quote, ReconcileOutcome, Result, SyncConfig, SyncNotice, SyncState};
use crate::infrastructure::{KeyValueStore, QuoteTransport};

use super::quote_store::{QuoteStore, StoreEvent};

/// Result of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Server snapshot matched local quotes.
    Unchanged,
    /// Server snapshot replaced local quotes.
    Replaced(SyncNotice),
    /// No snapshot was available (fetch failed or timed out).
    Skipped { reason: String },
}

impl From<ReconcileOutcome> for SyncOutcome {
    fn from(outcome: ReconcileOutcome) -> Self {
        match outcome {
            ReconcileOutcome::Unchanged => Self::Unchanged,
            ReconcileOutcome::Replaced(notice) => Self::Replaced(notice),
        }
    }
}

/// Service for synchronizing the quote store with the remote endpoint.
pub struct SyncService<S: KeyValueStore + 'static> {
    store: Arc<Mutex<QuoteStore<S>>>,
    transport: Arc<dyn QuoteTransport>,
    config: SyncConfig,
}

impl<S: KeyValueStore + 'static> Clone for SyncService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl<S: KeyValueStore + 'static> SyncService<S> {
    /// Create a sync service owning `store`.
    pub fn new(store: QuoteStore<S>, transport: Arc<dyn QuoteTransport>, config: SyncConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            transport,
            config,
        }
    }

    /// Shared handle to the store.
    #[must_use]
    pub fn store(&self) -> Arc<Mutex<QuoteStore<S>>> {
        Arc::clone(&self.store)
    }

    /// Receive store change notifications.
    pub async fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.lock().await.subscribe()
    }

    /// Current sync state.
    ///
    /// # Errors
    /// Returns error if the storage backend cannot be read.
    pub async fn state(&self) -> Result<SyncState> {
        self.store.lock().await.sync_state()
    }

    /// Run one fetch-and-reconcile cycle.
    ///
    /// The fetch runs without holding the store lock; comparison and
    /// replacement run under it.
    ///
    /// # Errors
    /// Returns error only if local persistence fails. Transport failures
    /// yield [`SyncOutcome::Skipped`].
    pub async fn sync_once(&self) -> Result<SyncOutcome> {
        {
            let mut store = self.store.lock().await;
            let state = store.sync_state()?.syncing();
            store.record_sync_state(&state)?;
        }

        let timeout = self.config.timeout();

        let remote = match tokio::time::timeout(timeout, self.transport.fetch_quotes()).await {
            Ok(Ok(remote)) => remote,
            Ok(Err(e)) => return self.skip(e.to_string()).await,
            Err(_) => {
                return self
                    .skip(format!("remote fetch timed out after {}s", timeout.as_secs()))
                    .await
            }
        };

        let remote = validate_remote(remote);

        let mut store = self.store.lock().await;
        let outcome = store.reconcile(remote)?;

        let replaced = matches!(outcome, ReconcileOutcome::Replaced(_));
        let state = store.sync_state()?.completed(replaced);
        store.record_sync_state(&state)?;

        Ok(outcome.into())
    }

    /// Record a failed fetch and report it as skipped.
    async fn skip(&self, reason: String) -> Result<SyncOutcome> {
        tracing::warn!(%reason, "Sync skipped");

        let mut store = self.store.lock().await;
        let state = store.sync_state()?.with_error(reason.clone());
        store.record_sync_state(&state)?;

        Ok(SyncOutcome::Skipped { reason })
    }

    /// Add a quote locally and, if enabled, replicate it in the background.
    ///
    /// The returned handle completes when replication finishes; dropping it
    /// does not cancel replication. Replication failures are logged only.
    ///
    /// # Errors
    /// Returns the store's validation or persistence error.
    pub async fn add_quote(
        &self,
        text: &str,
        category: &str,
    ) -> Result<(Quote, Option<JoinHandle<()>>)> {
        let quote = self.store.lock().await.add(text, category)?;

        if !self.config.push_on_add {
            return Ok((quote, None));
        }

        let transport = Arc::clone(&self.transport);
        let timeout = self.config.timeout();
        let pushed = quote.clone();

        let handle = tokio::spawn(async move {
            match tokio::time::timeout(timeout, transport.push_quote(&pushed)).await {
                Ok(Ok(())) => tracing::info!("Quote replicated to server"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Failed to replicate quote"),
                Err(_) => tracing::warn!("Quote replication timed out"),
            }
        });

        Ok((quote, Some(handle)))
    }

    /// Start polling the server every `interval`; the first cycle runs
    /// immediately.
    #[must_use]
    pub fn spawn_poller(&self, interval: Duration) -> PollerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let service = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match service.sync_once().await {
                            Ok(SyncOutcome::Replaced(notice)) => {
                                tracing::info!(notice = %notice.message, "Sync replaced local quotes");
                            }
                            Ok(SyncOutcome::Unchanged) => tracing::debug!("Sync: no changes"),
                            Ok(SyncOutcome::Skipped { .. }) => {}
                            Err(e) => tracing::error!(error = %e, "Sync cycle failed"),
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }

            tracing::debug!("Sync poller stopped");
        });

        PollerHandle { stop_tx, task }
    }
}

/// Handle to a running sync poller.
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the poller to stop and wait for it to exit.
    ///
    /// A cycle already in progress finishes first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Sync poller task failed");
        }
    }
}

/// Drop remote items that violate the quote invariants.
fn validate_remote(remote: Vec<Quote>) -> Vec<Quote> {
    let total = remote.len();
    let valid: Vec<Quote> = remote
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match Quote::new(&item.text, &item.category) {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!(index, error = %e, "Dropping invalid remote quote");
                None
            }
        })
        .collect();

    if valid.len() < total {
        tracing::warn!(dropped = total - valid.len(), "Remote snapshot contained invalid items");
    }

    valid
}
