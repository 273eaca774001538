use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

use crate::error::Result;
use crate::events::OutgoingMessage;

/// Per-viewer queue depth used when none is configured
pub const DEFAULT_VIEWER_BUFFER: usize = 256;

pub type ViewerId = u64;

/// Disconnect request raised by `push` when a viewer stops draining its queue
#[derive(Default)]
struct Eviction {
    requested: AtomicBool,
    notify: Notify,
}

impl Eviction {
    fn request(&self) {
        self.requested.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

#[derive(Clone)]
struct ViewerSlot {
    tx: mpsc::Sender<Arc<str>>,
    eviction: Arc<Eviction>,
}

struct Inner {
    viewers: DashMap<ViewerId, ViewerSlot>,
    next_id: AtomicU64,
    viewer_buffer: usize,
}

/// Thread-safe set of connected viewers
///
/// Cloning is cheap and every clone refers to the same membership set.
/// Membership only changes through [`BroadcastChannel::register`] and
/// [`BroadcastChannel::unregister`] (or dropping a [`Registration`]);
/// [`BroadcastChannel::push`] never adds or removes viewers.
#[derive(Clone)]
pub struct BroadcastChannel {
    inner: Arc<Inner>,
}

impl BroadcastChannel {
    pub fn new() -> Self {
        Self::with_viewer_buffer(DEFAULT_VIEWER_BUFFER)
    }

    /// Create a channel whose viewers each queue at most `viewer_buffer`
    /// undelivered payloads before being asked to disconnect
    pub fn with_viewer_buffer(viewer_buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                viewers: DashMap::new(),
                next_id: AtomicU64::new(1),
                viewer_buffer: viewer_buffer.max(1),
            }),
        }
    }

    /// Add a new viewer
    ///
    /// The returned [`Registration`] removes the viewer when dropped, so the
    /// connection task holding it unregisters on every exit path.
    pub fn register(&self) -> (Registration, ViewerInbox) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.viewer_buffer);
        let eviction = Arc::new(Eviction::default());

        self.inner.viewers.insert(
            id,
            ViewerSlot {
                tx,
                eviction: Arc::clone(&eviction),
            },
        );
        tracing::info!("Viewer {} registered. Total viewers: {}", id, self.viewer_count());

        let registration = Registration {
            id,
            channel: self.clone(),
        };
        let inbox = ViewerInbox { id, rx, eviction };
        (registration, inbox)
    }

    /// Remove a viewer. Removing an unknown id is a no-op.
    pub fn unregister(&self, id: ViewerId) {
        if self.inner.viewers.remove(&id).is_some() {
            tracing::info!("Viewer {} unregistered. Remaining: {}", id, self.viewer_count());
        }
    }

    /// Queue `payload` for every viewer registered right now
    ///
    /// Never waits on a viewer: each one has its own bounded FIFO queue
    /// drained by its connection task, which keeps per-viewer ordering and
    /// isolates slow viewers from each other and from the caller. A viewer
    /// whose queue is full is asked to disconnect. Returns how many viewers
    /// the payload was queued for.
    pub fn push(&self, payload: impl Into<Arc<str>>) -> usize {
        if self.inner.viewers.is_empty() {
            return 0;
        }

        let payload: Arc<str> = payload.into();
        // Snapshot first so no shard lock is held while sending
        let targets: Vec<(ViewerId, ViewerSlot)> = self
            .inner
            .viewers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut queued = 0;
        for (id, slot) in targets {
            match slot.tx.try_send(Arc::clone(&payload)) {
                Ok(()) => queued += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Viewer {} is not keeping up, requesting disconnect", id);
                    slot.eviction.request();
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("Viewer {} already closed", id);
                }
            }
        }
        queued
    }

    /// Serialize `message` and push it to every viewer
    pub fn broadcast(&self, message: &OutgoingMessage) -> Result<usize> {
        let json = message.to_json()?;
        Ok(self.push(json))
    }

    /// Get current viewer count
    pub fn viewer_count(&self) -> usize {
        self.inner.viewers.len()
    }

    pub fn contains(&self, id: ViewerId) -> bool {
        self.inner.viewers.contains_key(&id)
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Membership token for one viewer; unregisters on drop
pub struct Registration {
    id: ViewerId,
    channel: BroadcastChannel,
}

impl Registration {
    pub fn id(&self) -> ViewerId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.channel.unregister(self.id);
    }
}

/// Receiving end of one viewer's queue
pub struct ViewerInbox {
    id: ViewerId,
    rx: mpsc::Receiver<Arc<str>>,
    eviction: Arc<Eviction>,
}

impl ViewerInbox {
    pub fn id(&self) -> ViewerId {
        self.id
    }

    /// Next payload for this viewer
    ///
    /// Returns `None` once the viewer has been unregistered and its queue
    /// drained, or as soon as a disconnect has been requested.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        if self.eviction.is_requested() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.eviction.notify.notified() => None,
            payload = self.rx.recv() => payload,
        }
    }

    pub fn is_evicted(&self) -> bool {
        self.eviction.is_requested()
    }

    /// Resolves once a disconnect has been requested for this viewer
    ///
    /// Race it against socket writes so a viewer that stopped reading is
    /// still dropped while a send is stuck on a full buffer.
    pub async fn evicted(&self) {
        loop {
            let notified = self.eviction.notify.notified();
            if self.eviction.is_requested() {
                return;
            }
            notified.await;
        }
    }
}
