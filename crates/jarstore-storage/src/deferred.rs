//! Deferred adapter: mutations accumulate in [`PendingState`] and are flushed
//! together when the owner calls [`DeferredStorage::apply`], typically from a
//! session lifecycle event.
//!
//! Applying does not clear the pending state. Reads keep seeing pending
//! values until the owner calls [`DeferredStorage::clear_pending`] or
//! [`DeferredStorage::take_pending`].

use crate::backing::{BackingCapability, RecordSink, RecordSource, ResolvedBacking};
use crate::config::{StorageConfig, StorageMode};
use crate::error::Result;
use crate::pending::{PendingEntry, PendingState};
use crate::storage::{read_item, SessionStorage};
use async_trait::async_trait;
use jarstore_chunk::{Reconciler, ValueEncoding};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Session lifecycle events that may trigger a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEvent {
    /// Session loaded from storage at startup
    InitialSession,
    /// User signed in
    SignedIn,
    /// User signed out
    SignedOut,
    /// Access token was refreshed
    TokenRefreshed,
    /// User attributes changed
    UserUpdated,
    /// Password recovery flow started
    PasswordRecovery,
    /// Second factor verified
    MfaChallengeVerified,
}

impl LifecycleEvent {
    /// True if the event changes session state that must be persisted
    pub fn persists_session(self) -> bool {
        !matches!(self, LifecycleEvent::InitialSession)
    }
}

/// Adapter buffering mutations until an external trigger
pub struct DeferredStorage {
    backing: ResolvedBacking,
    reconciler: Reconciler,
    config: StorageConfig,
    pending: Mutex<PendingState>,
}

impl DeferredStorage {
    /// Build over `capability`; a missing backing store is rejected
    pub fn new(config: StorageConfig, capability: BackingCapability) -> Result<Self> {
        config.validate()?;
        let backing = capability.resolve(StorageMode::Deferred, config.probe_count)?;
        Ok(Self {
            backing,
            reconciler: config.reconciler(),
            config,
            pending: Mutex::new(PendingState::new()),
        })
    }

    /// Snapshot of the pending state
    pub async fn pending(&self) -> PendingState {
        self.pending.lock().await.clone()
    }

    /// True if any write or removal is pending
    pub async fn has_pending_changes(&self) -> bool {
        !self.pending.lock().await.is_empty()
    }

    /// Drop the pending state
    pub async fn clear_pending(&self) {
        self.pending.lock().await.clear();
    }

    /// Take the pending state, leaving it empty
    pub async fn take_pending(&self) -> PendingState {
        std::mem::take(&mut *self.pending.lock().await)
    }

    /// Flush the pending state. Returns true if a batch was handed to the
    /// backing sink; a read-only store drops it with a warning.
    #[instrument(skip(self))]
    pub async fn apply(&self) -> Result<bool> {
        let snapshot = self.pending().await;
        self.apply_state(&snapshot).await
    }

    /// Apply the pending state if `event` persists session state and
    /// anything is pending. Returns true if a batch was handed to the sink.
    pub async fn on_lifecycle_event(&self, event: LifecycleEvent) -> Result<bool> {
        if !event.persists_session() || !self.has_pending_changes().await {
            debug!(?event, "lifecycle event needs no flush");
            return Ok(false);
        }
        self.apply().await
    }

    async fn apply_state(&self, state: &PendingState) -> Result<bool> {
        apply_pending(
            self.backing.source.as_ref(),
            self.backing.sink.as_ref(),
            state,
            &self.reconciler,
            self.config.encoding,
        )
        .await
    }
}

/// Reconcile `pending` against the backing store and write the result.
///
/// Reads the records hinted by every pending key, builds one batch and hands
/// it to `sink` in a single call. Nothing is written when the batch is
/// empty. Returns true if a batch was handed to `sink`, whether or not the
/// sink persisted it.
pub async fn apply_pending(
    source: &dyn RecordSource,
    sink: &dyn RecordSink,
    pending: &PendingState,
    reconciler: &Reconciler,
    encoding: ValueEncoding,
) -> Result<bool> {
    if pending.is_empty() {
        return Ok(false);
    }

    let existing = source.read_records(&pending.hint_keys()).await?;
    let encoded: Vec<(&str, String)> = pending
        .writes()
        .map(|(key, value)| (key, encoding.encode(value)))
        .collect();
    let batch = reconciler.reconcile(
        &existing,
        encoded.iter().map(|(key, value)| (*key, value.as_str())),
        pending.removals(),
    )?;

    if batch.is_empty() {
        debug!("pending state already reflected in backing store");
        return Ok(false);
    }

    debug!(
        expire = batch.expire.len(),
        write = batch.write.len(),
        "flushing deferred batch"
    );
    sink.write_records(&batch.into_instructions()).await?;
    Ok(true)
}

#[async_trait]
impl SessionStorage for DeferredStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        {
            let pending = self.pending.lock().await;
            match pending.entry(key) {
                PendingEntry::Written(value) => return Ok(Some(value.to_string())),
                PendingEntry::Removed => return Ok(None),
                PendingEntry::Untouched => {}
            }
        }
        read_item(self.backing.source.as_ref(), key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // No later lifecycle event is guaranteed for transient keys, so they
        // are written through on their own as well.
        if self.config.is_transient_key(key) {
            debug!(key, "writing transient key through");
            self.apply_state(&PendingState::with_write(key, value))
                .await?;
        }
        self.pending.lock().await.set(key, value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.pending.lock().await.remove(key);
        Ok(())
    }

    fn is_server(&self) -> bool {
        true
    }
}
