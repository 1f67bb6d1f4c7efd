//! Digest subscriber set.
//!
//! Membership only grows: a chat is added the first time it sends the
//! subscribe trigger and stays until the process exits. Delivery failures do
//! not remove anyone. Nothing is persisted.

use crate::delivery::ChatId;
use std::collections::BTreeSet;
use std::sync::RwLock;

/// Store of chats that receive the daily digest.
pub trait SubscriberStore: Send + Sync {
    /// Add a chat. Returns `true` if it was not already subscribed.
    fn add(&self, chat_id: ChatId) -> bool;

    /// Membership at this instant. Later additions don't affect the snapshot.
    fn snapshot(&self) -> Vec<ChatId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime in-memory [`SubscriberStore`].
#[derive(Debug, Default)]
pub struct InMemorySubscribers {
    chats: RwLock<BTreeSet<ChatId>>,
}

impl InMemorySubscribers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriberStore for InMemorySubscribers {
    fn add(&self, chat_id: ChatId) -> bool {
        // A poisoned lock only means another thread panicked mid-insert; the
        // set itself is still valid.
        let mut chats = self.chats.write().unwrap_or_else(|e| e.into_inner());
        chats.insert(chat_id)
    }

    fn snapshot(&self) -> Vec<ChatId> {
        let chats = self.chats.read().unwrap_or_else(|e| e.into_inner());
        chats.iter().copied().collect()
    }

    fn len(&self) -> usize {
        self.chats.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_is_idempotent() {
        let store = InMemorySubscribers::new();
        assert!(store.is_empty());
        assert!(store.add(42));
        assert!(!store.add(42));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = InMemorySubscribers::new();
        store.add(1);
        store.add(2);
        let snapshot = store.snapshot();
        store.add(3);
        assert_eq!(snapshot, vec![1, 2]);
        assert_eq!(store.snapshot(), vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_and_snapshots() {
        let store = Arc::new(InMemorySubscribers::new());
        let mut handles = Vec::new();

        for i in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.add(i);
                // Snapshots taken mid-flight never see a torn set
                let snapshot = store.snapshot();
                assert!(snapshot.windows(2).all(|w| w[0] < w[1]));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 64);
    }
}
