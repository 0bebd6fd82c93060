//! Single-flight coordination for session calls (token refresh, identity).
//!
//! ```text
//!            first caller                 settlement
//!   Idle ─────────────────→ InFlight ───────────────→ Idle
//!                            │    ↑
//!                            └────┘ later callers attach to the same handle
//! ```
//!
//! The in-flight call is a [`Shared`] future: every caller that finds the
//! slot in `InFlight` clones the handle and awaits it, so they all observe
//! the single outcome of a single network call. Whichever caller happens
//! to poll the shared future drives it; the others are woken when it
//! completes.
//!
//! The slot is cleared from *inside* the shared future, after the work
//! (including its state update) finished and before the outcome is
//! returned. By the time any waiter sees the result, the next caller
//! already finds `Idle` and starts a fresh call instead of reusing the
//! settled one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use crate::SessionError;

/// What every waiter on a flight receives.
pub(crate) type FlightOutcome<V> = Result<V, SessionError>;

type SharedCall<V> = Shared<BoxFuture<'static, FlightOutcome<V>>>;

enum FlightState<V: Clone> {
    Idle,
    InFlight { id: u64, handle: SharedCall<V> },
}

/// At most one call in flight; everyone else waits on it.
pub(crate) struct SingleFlight<V: Clone> {
    /// Shows up in logs: "refresh", "identity".
    name: &'static str,
    slot: Mutex<FlightState<V>>,
    /// Number of calls ever started. Doubles as the id source.
    started: AtomicU64,
}

impl<V> SingleFlight<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            slot: Mutex::new(FlightState::Idle),
            started: AtomicU64::new(0),
        })
    }

    /// Awaits the in-flight call, or starts `work` as the new one.
    ///
    /// `work` is only called when the slot is idle. The lock on the slot is
    /// held for the check-and-set alone, never while the call runs.
    pub(crate) async fn run<F>(self: &Arc<Self>, work: F) -> FlightOutcome<V>
    where
        F: FnOnce() -> BoxFuture<'static, FlightOutcome<V>>,
    {
        let handle = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                FlightState::InFlight { id, handle } => {
                    tracing::trace!(flight = self.name, id, "joining in-flight call");
                    handle.clone()
                }
                FlightState::Idle => {
                    let id = self.started.fetch_add(1, Ordering::SeqCst) + 1;
                    // Weak, so an abandoned call parked in the slot
                    // doesn't keep the flight alive through a cycle.
                    let flight: Weak<Self> = Arc::downgrade(self);
                    let call = work();
                    let handle = async move {
                        let outcome = call.await;
                        if let Some(flight) = flight.upgrade() {
                            flight.settle(id).await;
                        }
                        outcome
                    }
                    .boxed()
                    .shared();

                    *slot = FlightState::InFlight {
                        id,
                        handle: handle.clone(),
                    };
                    tracing::debug!(flight = self.name, id, "call started");
                    handle
                }
            }
        };

        handle.await
    }

    /// Returns the slot to `Idle` if call `id` still owns it.
    async fn settle(&self, id: u64) {
        let mut slot = self.slot.lock().await;
        if matches!(&*slot, FlightState::InFlight { id: current, .. } if *current == id)
        {
            *slot = FlightState::Idle;
            tracing::debug!(flight = self.name, id, "call settled");
        }
    }

    /// How many calls have been started so far.
    pub(crate) fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) async fn is_busy(&self) -> bool {
        matches!(&*self.slot.lock().await, FlightState::InFlight { .. })
    }
}
