//! Registry of live persistent connections.
//!
//! One exclusive lock guards the collection. Readers take a snapshot of
//! the matching handles and forward outside the lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::debug;

use hushwire_proto::Envelope;

use crate::error::TransportError;

/// Process-unique id telling apart connections that share an identifier.
pub type ConnectionId = u64;

/// Registry-side view of one connection: where to send its envelopes and
/// how to tell it to close.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    user_id: Arc<str>,
    outbound: mpsc::UnboundedSender<Envelope>,
    close: Arc<watch::Sender<bool>>,
}

/// Connection-side ends of a [`ConnectionHandle`].
#[derive(Debug)]
pub struct Outbox {
    pub envelopes: mpsc::UnboundedReceiver<Envelope>,
    pub closed: watch::Receiver<bool>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Queue an envelope for the connection's writer. Fails once the
    /// writer has gone away.
    pub fn forward(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.outbound
            .send(envelope)
            .map_err(|_| TransportError::WriteFailed(format!("connection {} writer closed", self.id)))
    }

    pub fn close(&self) {
        self.close.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.close.borrow() || self.outbound.is_closed()
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    clients: Mutex<Vec<ConnectionHandle>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle for `user_id` and the receiving ends that go with it.
    /// The handle is not registered until passed to [`add_client`](Self::add_client).
    pub fn open(&self, user_id: &str) -> (ConnectionHandle, Outbox) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (outbound, envelopes) = mpsc::unbounded_channel();
        let (close, closed) = watch::channel(false);
        let handle = ConnectionHandle {
            id,
            user_id: Arc::from(user_id),
            outbound,
            close: Arc::new(close),
        };
        (handle, Outbox { envelopes, closed })
    }

    /// Append a connection. Duplicate identifiers are kept side by side.
    pub async fn add_client(&self, handle: ConnectionHandle) {
        let mut clients = self.clients.lock().await;
        debug!(conn = handle.id, user = %handle.user_id, "Registering connection");
        clients.push(handle);
    }

    /// Remove every connection registered under `handle`'s identifier and
    /// signal each of them to close. Returns how many were removed.
    pub async fn remove_client(&self, handle: &ConnectionHandle) -> usize {
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        clients.retain(|c| {
            if c.user_id == handle.user_id {
                c.close();
                false
            } else {
                true
            }
        });
        before - clients.len()
    }

    /// Remove exactly one connection by id and signal it to close.
    pub async fn evict(&self, id: ConnectionId) -> bool {
        let mut clients = self.clients.lock().await;
        match clients.iter().position(|c| c.id == id) {
            Some(index) => {
                clients.swap_remove(index).close();
                true
            }
            None => false,
        }
    }

    /// Handles currently registered for `recipient`, cloned under the lock.
    pub async fn snapshot_for(&self, recipient: &str) -> Vec<ConnectionHandle> {
        let clients = self.clients.lock().await;
        clients
            .iter()
            .filter(|c| &*c.user_id == recipient)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(to: &str) -> Envelope {
        Envelope::new("sender", to, vec![1, 2, 3], "2024-01-01T00:00:00Z", [0u8; 24])
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = ConnectionRegistry::new();
        let (a, _) = registry.open("alice");
        let (b, _) = registry.open("alice");
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_add_and_snapshot() {
        let registry = ConnectionRegistry::new();
        let (alice, _alice_out) = registry.open("alice");
        let (bob, _bob_out) = registry.open("bob");
        registry.add_client(alice.clone()).await;
        registry.add_client(bob).await;

        let snapshot = registry.snapshot_for("alice").await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), alice.id());
        assert!(registry.snapshot_for("carol").await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_both_listed() {
        let registry = ConnectionRegistry::new();
        let (first, _o1) = registry.open("alice");
        let (second, _o2) = registry.open("alice");
        registry.add_client(first).await;
        registry.add_client(second).await;
        assert_eq!(registry.snapshot_for("alice").await.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_client_removes_all_and_signals_close() {
        let registry = ConnectionRegistry::new();
        let (first, mut out1) = registry.open("alice");
        let (second, out2) = registry.open("alice");
        let (bob, out3) = registry.open("bob");
        registry.add_client(first.clone()).await;
        registry.add_client(second).await;
        registry.add_client(bob).await;

        assert_eq!(registry.remove_client(&first).await, 2);
        assert_eq!(registry.len().await, 1);
        assert!(*out1.closed.borrow_and_update());
        assert!(*out2.closed.borrow());
        assert!(!*out3.closed.borrow());

        // Idempotent
        assert_eq!(registry.remove_client(&first).await, 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_evict_spares_newer_duplicate() {
        let registry = ConnectionRegistry::new();
        let (stale, stale_out) = registry.open("alice");
        let (fresh, fresh_out) = registry.open("alice");
        registry.add_client(stale.clone()).await;
        registry.add_client(fresh.clone()).await;

        assert!(registry.evict(stale.id()).await);
        assert!(!registry.evict(stale.id()).await);

        let remaining = registry.snapshot_for("alice").await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), fresh.id());
        assert!(*stale_out.closed.borrow());
        assert!(!*fresh_out.closed.borrow());
    }

    #[tokio::test]
    async fn test_forward_reaches_outbox() {
        let registry = ConnectionRegistry::new();
        let (handle, mut outbox) = registry.open("alice");
        handle.forward(envelope("alice")).unwrap();
        assert_eq!(outbox.envelopes.recv().await, Some(envelope("alice")));
    }

    #[tokio::test]
    async fn test_forward_fails_after_outbox_dropped() {
        let registry = ConnectionRegistry::new();
        let (handle, outbox) = registry.open("alice");
        drop(outbox);
        assert!(handle.is_closed());
        assert!(matches!(
            handle.forward(envelope("alice")),
            Err(TransportError::WriteFailed(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_remove_stays_consistent() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();

        for i in 0..100 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let user = format!("user-{}", i % 50);
                let (handle, outbox) = registry.open(&user);
                registry.add_client(handle.clone()).await;
                if i % 2 == 0 {
                    registry.remove_client(&handle).await;
                }
                outbox
            }));
        }

        let mut outboxes = Vec::new();
        for task in tasks {
            outboxes.push(task.await.unwrap());
        }

        // user-k is opened by tasks k and k + 50, which share parity: even
        // users are always fully removed, odd users keep both connections.
        let mut registered = 0;
        for i in 0..50 {
            let user = format!("user-{i}");
            let handles = registry.snapshot_for(&user).await;
            let expected = if i % 2 == 0 { 0 } else { 2 };
            assert_eq!(handles.len(), expected, "{user}");
            for handle in handles {
                assert!(!handle.is_closed());
                registered += 1;
            }
        }
        assert_eq!(registered, 50);
        assert_eq!(registry.len().await, 50);

        let open = outboxes.iter().filter(|o| !*o.closed.borrow()).count();
        assert_eq!(open, registered);
    }
}
