//! Last-writer-wins deduplication of in-flight mutations.
//!
//! At most one non-idempotent request per signature is in flight. A second
//! request with the same signature aborts the first before proceeding, so a
//! rapid double submit reaches the server once. The aborted caller resolves
//! with the supersession signal, not an unwound panic or a generic network
//! failure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::{AbortHandle, AbortRegistration};
use tokio::sync::Mutex;

struct Pending {
    handle: AbortHandle,
    generation: u64,
}

/// Tracks in-flight mutations by request signature.
pub struct RequestDeduper {
    pending: Mutex<HashMap<String, Pending>>,
    counter: AtomicU64,
}

impl Default for RequestDeduper {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestDeduper {
    /// Creates an empty deduper.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Aborts and removes any in-flight request with this signature.
    pub async fn supersede(&self, signature: &str) {
        if let Some(prior) = self.pending.lock().await.remove(signature) {
            tracing::debug!(signature, "superseding in-flight request");
            prior.handle.abort();
        }
    }

    /// Registers a new attempt under this signature, replacing (without
    /// aborting) any registration already present; a retry of the same
    /// logical request re-registers itself this way. Returns the abort
    /// registration to wrap the network call with, and the generation used
    /// to complete it.
    pub async fn register(&self, signature: &str) -> (AbortRegistration, u64) {
        let (handle, registration) = AbortHandle::new_pair();
        let generation = self.counter.fetch_add(1, Ordering::SeqCst);
        self.pending
            .lock()
            .await
            .insert(signature.to_string(), Pending { handle, generation });
        (registration, generation)
    }

    /// Removes the registration after the attempt finished, unless a newer
    /// attempt has taken over the signature in the meantime.
    pub async fn complete(&self, signature: &str, generation: u64) {
        let mut pending = self.pending.lock().await;
        if pending
            .get(signature)
            .is_some_and(|p| p.generation == generation)
        {
            pending.remove(signature);
        }
    }

    /// Number of in-flight registrations.
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Returns `true` when nothing is in flight.
    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }
}
