//! External camera stores
//!
//! A store owns the persisted camera list and relays every change as a full
//! replacement list, in the order the changes were made. Each published list
//! carries a revision that only ever goes up, so a reader holding a fetched
//! list can tell which queued notifications are older than it.

use crate::errors::CameraError;
use crate::types::CameraDefinition;
use async_trait::async_trait;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Buffered change notifications per subscriber before it counts as lagging
pub const CHANGE_FEED_CAPACITY: usize = 16;

/// A full camera list as published by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryUpdate {
    /// Strictly increasing per store; 0 is the state before any publication.
    pub revision: u64,
    pub cameras: Vec<CameraDefinition>,
}

impl RegistryUpdate {
    pub fn new(revision: u64, cameras: Vec<CameraDefinition>) -> Self {
        Self { revision, cameras }
    }
}

#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Current persisted list, in display order, with the revision it belongs to.
    async fn fetch(&self) -> Result<RegistryUpdate, CameraError>;

    /// Feed of full replacement lists, delivered in publication order.
    fn changes(&self) -> broadcast::Receiver<RegistryUpdate>;
}

struct Versioned {
    revision: u64,
    cameras: Vec<CameraDefinition>,
}

/// In-process store and relay.
///
/// Every mutation publishes the complete new list.
pub struct MemoryStore {
    state: RwLock<Versioned>,
    notify: broadcast::Sender<RegistryUpdate>,
}

impl MemoryStore {
    pub fn new(initial: Vec<CameraDefinition>) -> Self {
        let (notify, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            state: RwLock::new(Versioned {
                revision: 0,
                cameras: initial,
            }),
            notify,
        }
    }

    /// Current contents, without going through the async fetch path
    pub fn cameras(&self) -> Vec<CameraDefinition> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .cameras
            .clone()
    }

    /// Revision of the current contents.
    pub fn revision(&self) -> u64 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).revision
    }

    /// Replace the whole list.
    pub fn set(&self, cameras: Vec<CameraDefinition>) {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        guard.cameras = cameras;
        self.publish(&mut guard);
    }

    /// Append a camera and return its index.
    pub fn push(&self, camera: CameraDefinition) -> usize {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        guard.cameras.push(camera);
        self.publish(&mut guard);
        guard.cameras.len() - 1
    }

    /// Remove the camera at `index`, shifting later cameras down by one.
    pub fn remove(&self, index: usize) -> Option<CameraDefinition> {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        if index >= guard.cameras.len() {
            return None;
        }
        let removed = guard.cameras.remove(index);
        self.publish(&mut guard);
        Some(removed)
    }

    // Called with the write lock held so revisions and notifications keep mutation order.
    fn publish(&self, state: &mut Versioned) {
        state.revision += 1;
        log::debug!(
            "Publishing registry revision {}: {} camera(s)",
            state.revision,
            state.cameras.len()
        );
        // No subscribers is fine; late subscribers fetch first.
        let _ = self
            .notify
            .send(RegistryUpdate::new(state.revision, state.cameras.clone()));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn fetch(&self) -> Result<RegistryUpdate, CameraError> {
        let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(RegistryUpdate::new(guard.revision, guard.cameras.clone()))
    }

    fn changes(&self) -> broadcast::Receiver<RegistryUpdate> {
        self.notify.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(name: &str) -> CameraDefinition {
        CameraDefinition::new(name, "data:image/png;base64,AAAA")
    }

    #[tokio::test]
    async fn test_mutations_publish_full_lists_in_order() {
        let store = MemoryStore::default();
        let mut rx = store.changes();

        assert_eq!(store.push(camera("A")), 0);
        assert_eq!(store.push(camera("B")), 1);
        assert_eq!(store.remove(0).map(|c| c.name), Some("A".to_string()));

        assert_eq!(rx.recv().await.unwrap().cameras.len(), 1);
        assert_eq!(rx.recv().await.unwrap().cameras.len(), 2);
        let last = rx.recv().await.unwrap();
        assert_eq!(last.cameras, vec![camera("B")]);
        assert_eq!(store.fetch().await.unwrap(), last);
    }

    #[tokio::test]
    async fn test_revisions_increase_with_each_publication() {
        let store = MemoryStore::new(vec![camera("A")]);
        let mut rx = store.changes();
        assert_eq!(store.fetch().await.unwrap().revision, 0);

        store.push(camera("B"));
        store.set(vec![camera("C")]);

        let first = rx.recv().await.unwrap().revision;
        let second = rx.recv().await.unwrap().revision;
        assert!(first < second);
        assert_eq!(store.revision(), second);
        assert_eq!(store.fetch().await.unwrap().revision, second);
    }

    #[test]
    fn test_remove_out_of_range_does_not_publish() {
        let store = MemoryStore::new(vec![camera("A")]);
        let mut rx = store.changes();
        assert!(store.remove(3).is_none());
        assert!(rx.try_recv().is_err());
        assert_eq!(store.revision(), 0);
    }
}
