//! Bounded intake shared by the acceptor and the worker pool.
//!
//! One mutex guards the pending FIFO and the two occupancy counters; two
//! condition variables carry the wake protocol: `slot_freed` wakes a parked
//! acceptor when a worker completes, `work_ready` wakes parked workers when
//! an admission may have queued work. The lock is never held across I/O.

use crate::config::Policy;
use crate::server::connection::Conn;
use crate::server::queue::PendingQueue;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub(crate) struct Intake {
    state: Mutex<State>,
    slot_freed: Condvar,
    work_ready: Condvar,
    capacity: usize,
    policy: Policy,
}

struct State {
    pending: PendingQueue,
    /// Records currently in the FIFO. Always equals `pending.len()`.
    waiting: usize,
    /// Records currently held by executing workers.
    in_flight: usize,
}

impl State {
    #[inline]
    fn occupancy(&self) -> usize {
        self.waiting + self.in_flight
    }

    #[inline]
    fn admit_waiter(&mut self, conn: Conn) {
        self.pending.enqueue(conn);
        self.waiting += 1;
    }

    // `waiting` mirrors the physical queue length at every stable point.
    #[inline]
    fn check_counters(&self) {
        debug_assert_eq!(self.waiting, self.pending.len());
    }
}

impl Intake {
    pub(crate) fn new(capacity: usize, policy: Policy) -> Self {
        Self {
            state: Mutex::new(State {
                pending: PendingQueue::with_capacity(capacity),
                waiting: 0,
                in_flight: 0,
            }),
            slot_freed: Condvar::new(),
            work_ready: Condvar::new(),
            capacity,
            policy,
        }
    }

    // A worker can only poison the lock by panicking between `next` and
    // `complete`, where it holds no guard; recover instead of propagating.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits, rejects, or trades `conn` against the current occupancy.
    ///
    /// Acceptor side. With slack available the record is queued directly;
    /// at capacity the configured [`Policy`] decides. Workers are woken
    /// before returning, whether or not this call produced work.
    pub(crate) fn admit(&self, conn: Conn) {
        let mut state = self.lock();

        if state.in_flight == self.capacity {
            // Every slot is actively executing: nothing to evict, nothing
            // to wait for that a policy could speed up. Close the arrival.
            debug!(in_flight = state.in_flight, "intake saturated by active requests, dropping arrival");
            drop(conn);
        } else if state.occupancy() < self.capacity {
            state.admit_waiter(conn);
        } else {
            // Over capacity with in_flight < capacity, so at least one
            // waiter exists for the evicting policies to work with.
            match self.policy {
                Policy::Block => {
                    while state.occupancy() >= self.capacity {
                        state = self
                            .slot_freed
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    state.admit_waiter(conn);
                }
                Policy::DropTail | Policy::Unknown => {
                    debug!(waiting = state.waiting, "queue full, dropping arrival");
                    drop(conn);
                }
                Policy::DropHead => {
                    if let Some(victim) = state.pending.peek() {
                        debug!(peer = ?victim.stream().peer_addr().ok(), "queue full, evicting oldest waiter");
                    }
                    drop(state.pending.dequeue());
                    // The freed slot is reused immediately; `waiting` is
                    // unchanged by the trade.
                    state.pending.enqueue(conn);
                }
                Policy::RandomHalf => {
                    let evict = state.waiting.div_ceil(2);
                    debug!(waiting = state.waiting, evict, "queue full, purging oldest half");
                    for _ in 0..evict {
                        drop(state.pending.dequeue());
                    }
                    state.waiting -= evict;
                    state.admit_waiter(conn);
                }
            }
        }

        state.check_counters();
        self.work_ready.notify_all();
    }

    /// Blocks until a record is available, then dequeues it.
    ///
    /// Worker side. The record leaves the FIFO and moves to in-flight in
    /// one critical section; its dispatch time is stamped before the lock
    /// is released.
    pub(crate) fn next(&self) -> Conn {
        let mut state = self.lock();
        loop {
            if let Some(mut conn) = state.pending.dequeue() {
                state.waiting -= 1;
                state.in_flight += 1;
                state.check_counters();
                conn.mark_dispatched();
                return conn;
            }
            state = self
                .work_ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marks one in-flight request finished and wakes a parked acceptor.
    ///
    /// Worker side, called after the response is written and the socket
    /// closed.
    pub(crate) fn complete(&self) {
        let mut state = self.lock();
        state.in_flight -= 1;
        self.slot_freed.notify_one();
    }

    #[cfg(test)]
    pub(crate) fn counters(&self) -> (usize, usize) {
        let state = self.lock();
        debug_assert_eq!(state.waiting, state.pending.len());
        (state.waiting, state.in_flight)
    }
}
