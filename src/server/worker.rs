use crate::server::admission::Intake;
use crate::server::server_impl::Responder;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};

/// Request counters owned by a single worker thread.
///
/// Not shared: each worker mutates only its own record, so no
/// synchronization is needed. The counters are embedded verbatim in the
/// `Stat-Thread-*::` response headers, which is why the responder updates
/// them *before* composing the header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    id: usize,
    handled: u64,
    static_hits: u64,
    dynamic_hits: u64,
}

impl WorkerStats {
    #[inline]
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            handled: 0,
            static_hits: 0,
            dynamic_hits: 0,
        }
    }

    /// 0-based worker id, assigned at spawn.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Total requests handled, errors included.
    #[inline]
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Successful static responses.
    #[inline]
    pub fn static_hits(&self) -> u64 {
        self.static_hits
    }

    /// Successful dynamic responses.
    #[inline]
    pub fn dynamic_hits(&self) -> u64 {
        self.dynamic_hits
    }

    /// Counts an error response: only the total moves.
    #[inline]
    pub fn record_error(&mut self) {
        self.handled += 1;
    }

    /// Counts a successful static response.
    #[inline]
    pub fn record_static(&mut self) {
        self.handled += 1;
        self.static_hits += 1;
    }

    /// Counts a successful dynamic response.
    #[inline]
    pub fn record_dynamic(&mut self) {
        self.handled += 1;
        self.dynamic_hits += 1;
    }
}

/// Worker thread body: dequeue, respond, close, repeat, forever.
///
/// No per-request failure escapes this loop. Responder errors are logged;
/// responder panics are caught and logged. Either way the socket is closed
/// (the record drops here) and the slot is handed back before the next
/// iteration.
pub(crate) fn run<R: Responder>(intake: Arc<Intake>, responder: Arc<R>, id: usize) {
    let mut stats = WorkerStats::new(id);
    loop {
        let mut conn = intake.next();

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| responder.respond(&mut conn, &mut stats)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(worker = id, %err, "request failed mid-response"),
            Err(_) => error!(worker = id, "responder panicked; connection closed"),
        }

        drop(conn);
        intake.complete();
    }
}
