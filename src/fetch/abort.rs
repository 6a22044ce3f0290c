//! Cooperative request cancellation.
//!
//! An [`AbortController`] is the only state in the pipeline mutated by
//! more than one concurrent party: the executor binds it after dispatch,
//! the owner may abort it at any time. A single mutex guards the struct
//! so bind/abort races resolve deterministically.

use crate::fetch::coordinator::StreamCmd;
use crate::transport::{CorrelationId, Transport};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct AbortState {
    bound: Option<(CorrelationId, Arc<dyn Transport>)>,
    aborted: bool,
    stream_cancel: Option<mpsc::UnboundedSender<StreamCmd>>,
}

/// Shared cancellation token for one in-flight request.
///
/// Lifecycle: created before dispatch, bound to a correlation id once the
/// transport accepts the request, optionally aborted, dropped after the
/// request resolves. Binding is late: an abort requested before the bind
/// sets the flag but forwards nothing to the transport.
#[derive(Clone)]
pub struct AbortController {
    state: Arc<Mutex<AbortState>>,
    token: u64,
}

impl AbortController {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(AbortState::default())),
            token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Unique identity token for this controller.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Whether `abort` has been called. Never blocks beyond the mutex.
    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    /// Request cancellation. Idempotent: only the first call flips the
    /// flag, forwards a best-effort cancel to the transport for the bound
    /// id, and tears down an attached stream coordinator.
    pub fn abort(&self) {
        let (bound, stream_cancel) = {
            let mut state = self.lock();
            if state.aborted {
                return;
            }
            state.aborted = true;
            (state.bound.clone(), state.stream_cancel.take())
        };
        // Collaborators are notified outside the lock.
        if let Some((id, transport)) = bound {
            tracing::debug!(id = %id, "aborting in-flight request");
            transport.cancel(id);
        }
        if let Some(cancel) = stream_cancel {
            let _ = cancel.send(StreamCmd::Cancel);
        }
    }

    /// Attach the dispatched request's correlation id. First bind wins;
    /// later binds are ignored.
    pub(crate) fn bind(&self, id: CorrelationId, transport: Arc<dyn Transport>) {
        let mut state = self.lock();
        if state.bound.is_none() {
            state.bound = Some((id, transport));
        }
    }

    /// Register the cancel handle of a spawned stream coordinator. If the
    /// controller is already aborted, the coordinator is torn down on the
    /// spot.
    pub(crate) fn attach_stream(&self, cancel: mpsc::UnboundedSender<StreamCmd>) {
        let mut state = self.lock();
        if state.aborted {
            let _ = cancel.send(StreamCmd::Cancel);
        } else {
            state.stream_cancel = Some(cancel);
        }
    }

    fn lock(&self) -> MutexGuard<'_, AbortState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}
