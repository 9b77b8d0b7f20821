//! Prompt streams and per-session cancellation
//!
//! Every streaming call gets its own [`CancelHandle`]. Cancellation is
//! cooperative: the stream checks its flag around each fragment read and
//! ends quietly once it is set. An in-flight network read is never aborted.

use super::client::ChunkStream;
use super::registry::SharedProvider;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cancellation flag for one streaming session
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the stream stop after the fragment being read
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Registry of live streaming sessions
#[derive(Debug, Default)]
pub(crate) struct SessionTracker {
    next_id: AtomicU64,
    active: Mutex<HashMap<u64, CancelHandle>>,
}

impl SessionTracker {
    /// Register a session; it ends when the returned guard drops.
    pub(crate) fn begin(self: &Arc<Self>, provider: SharedProvider) -> SessionGuard {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancelHandle::new();
        self.active.lock().insert(id, cancel.clone());
        debug!(session = id, provider = %provider.name(), "Stream session started");

        SessionGuard {
            id,
            tracker: Arc::clone(self),
            provider,
            cancel,
        }
    }

    /// Cancel every live session, returning how many were signalled
    pub(crate) fn cancel_all(&self) -> usize {
        let active = self.active.lock();
        for cancel in active.values() {
            cancel.cancel();
        }
        active.len()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

/// Ends a session on drop: deregisters it and resets the provider's client
pub(crate) struct SessionGuard {
    id: u64,
    tracker: Arc<SessionTracker>,
    provider: SharedProvider,
    cancel: CancelHandle,
}

impl SessionGuard {
    pub(crate) fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.tracker.active.lock().remove(&self.id);
        self.provider.reset_client();
        debug!(session = self.id, provider = %self.provider.name(), "Stream session ended");
    }
}

/// Lazy, single-pass sequence of text fragments from one streaming call
///
/// Yields fragments in arrival order. Ends early without an error once
/// cancelled; a provider error is yielded once and ends the stream. Session
/// cleanup runs when the stream ends or is dropped, whichever comes first.
pub struct PromptStream {
    chunks: ChunkStream,
    cancel: CancelHandle,
    guard: Option<SessionGuard>,
}

impl PromptStream {
    pub(crate) fn new(chunks: ChunkStream, guard: SessionGuard) -> Self {
        Self {
            chunks,
            cancel: guard.cancel_handle().clone(),
            guard: Some(guard),
        }
    }

    /// Handle that cancels this stream only
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Whether the session is still open
    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }

    fn finish(&mut self) {
        self.guard = None;
    }

    fn interrupted(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            info!("Stream interrupted");
            self.finish();
            return true;
        }
        false
    }
}

impl Iterator for PromptStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.guard.as_ref()?;
        if self.interrupted() {
            return None;
        }

        match self.chunks.next() {
            // A fragment that arrived after cancellation is not delivered
            Some(Ok(_)) if self.interrupted() => None,
            Some(Ok(text)) => Some(Ok(text)),
            Some(Err(err)) => {
                self.finish();
                Some(Err(err))
            }
            None => {
                debug!("Stream exhausted");
                self.finish();
                None
            }
        }
    }
}
