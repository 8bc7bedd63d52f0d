//! Camera registry client
//!
//! Holds the latest `RegistrySnapshot` and keeps it in step with an external
//! store. The snapshot is only ever swapped wholesale; readers never see a
//! partial update.

pub mod file;
pub mod store;

pub use file::JsonFileStore;
pub use store::{MemoryStore, RegistryStore, RegistryUpdate};

use crate::errors::CameraError;
use crate::types::{CameraDefinition, RegistrySnapshot};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

type ChangeHandler = Box<dyn Fn(&RegistrySnapshot) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    handlers: Vec<ChangeHandler>,
    // Store revision of the current snapshot, if it came from a store.
    revision: Option<u64>,
}

pub struct RegistryClient {
    current: watch::Sender<RegistrySnapshot>,
    loaded: watch::Sender<bool>,
    subscribers: Mutex<Subscribers>,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl RegistryClient {
    /// Client with an empty snapshot and no store attached.
    pub fn new() -> Self {
        let (current, _) = watch::channel(RegistrySnapshot::empty());
        let (loaded, _) = watch::channel(false);
        Self {
            current,
            loaded,
            subscribers: Mutex::new(Subscribers::default()),
            follower: Mutex::new(None),
        }
    }

    /// Attach to `store`: fetch once, then follow its change feed.
    ///
    /// Until the first fetch resolves the snapshot stays empty, so callers see
    /// real-device behavior while loading. A failed first fetch still counts as
    /// loaded, with the empty snapshot. Must be called inside a Tokio runtime.
    pub fn connect(store: Arc<dyn RegistryStore>) -> Arc<Self> {
        let client = Arc::new(Self::new());
        // Subscribe before fetching so no change between the two is lost.
        let changes = store.changes();
        let handle = tokio::spawn(follow(Arc::downgrade(&client), store, changes));
        *client.follower.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        client
    }

    /// Latest known snapshot.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.current.borrow().clone()
    }

    /// Whether the first snapshot is settled: received, or given up on.
    pub fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    /// Resolves once the first snapshot is in place.
    pub async fn wait_until_loaded(&self) {
        let mut rx = self.loaded.subscribe();
        // The sender lives as long as `self`, so this cannot fail while borrowed.
        let _ = rx.wait_for(|loaded| *loaded).await;
    }

    /// Register a callback run synchronously on every replacement.
    ///
    /// Handlers must not register further handlers.
    pub fn on_change<F>(&self, handler: F)
    where
        F: Fn(&RegistrySnapshot) + Send + Sync + 'static,
    {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .handlers
            .push(Box::new(handler));
    }

    /// Receiver whose first read is the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
        self.current.subscribe()
    }

    /// Swap in a new snapshot and notify every handler.
    pub fn replace(&self, cameras: Vec<CameraDefinition>) -> RegistrySnapshot {
        // Holding the subscriber lock keeps swaps and callbacks in the same order.
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        self.swap(&subscribers, RegistrySnapshot::new(cameras))
    }

    /// Swap in a store publication unless the current snapshot is already
    /// at or past its revision.
    ///
    /// Returns the snapshot now current, whether or not `update` was applied.
    pub fn apply(&self, update: RegistryUpdate) -> RegistrySnapshot {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(applied) = subscribers.revision {
            if update.revision <= applied {
                log::debug!(
                    "Skipping registry revision {} (already at {})",
                    update.revision,
                    applied
                );
                drop(subscribers);
                return self.snapshot();
            }
        }
        subscribers.revision = Some(update.revision);
        self.swap(&subscribers, RegistrySnapshot::new(update.cameras))
    }

    fn swap(&self, subscribers: &Subscribers, snapshot: RegistrySnapshot) -> RegistrySnapshot {
        self.current.send_replace(snapshot.clone());
        self.loaded.send_replace(true);
        log::info!("Registry snapshot replaced: {} camera(s)", snapshot.len());
        for handler in subscribers.handlers.iter() {
            handler(&snapshot);
        }
        snapshot
    }

    // Settle loading without a store result; the snapshot stays as it is.
    fn give_up_loading(&self) {
        self.loaded.send_replace(true);
    }

    /// Fetch from `store` now and apply the result.
    pub async fn refresh(&self, store: &dyn RegistryStore) -> Result<RegistrySnapshot, CameraError> {
        let update = store.fetch().await?;
        Ok(self.apply(update))
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RegistryClient {
    fn drop(&mut self) {
        if let Some(handle) = self.follower.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

async fn follow(
    client: Weak<RegistryClient>,
    store: Arc<dyn RegistryStore>,
    mut changes: broadcast::Receiver<RegistryUpdate>,
) {
    let fetched = store.fetch().await;
    let Some(current) = client.upgrade() else { return };
    match fetched {
        Ok(update) => {
            current.apply(update);
        }
        Err(e) => {
            log::warn!("Initial registry fetch failed, staying on current snapshot: {}", e);
            current.give_up_loading();
        }
    }
    drop(current);

    // Notifications queued before the fetch are at or below its revision and get skipped.
    loop {
        match changes.recv().await {
            Ok(update) => {
                let Some(client) = client.upgrade() else { break };
                client.apply(update);
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                log::warn!("Registry client missed {} change(s), re-fetching", missed);
                let Some(client) = client.upgrade() else { break };
                if let Err(e) = client.refresh(store.as_ref()).await {
                    log::warn!("Registry re-fetch failed: {}", e);
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                log::info!("Registry change feed closed");
                break;
            }
        }
    }
}
