//! Connection state tracking.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle state of a managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been built yet, or the last dial failed.
    Disconnected,

    /// A dial is in progress.
    Connecting,

    /// A connection is live (it may still be marked broken by a caller or
    /// the keep-alive monitor; it is rebuilt on the next checkout).
    Connected,

    /// The manager was closed; no connection will be built again.
    Closed,
}

/// Atomic state plus a count of connections built.
#[derive(Default)]
pub(crate) struct StateTracker {
    state: AtomicU8,
    connects: AtomicU64,
}

impl StateTracker {
    pub(crate) fn state(&self) -> ConnectionState {
        Self::decode(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        self.state.store(Self::encode(state), Ordering::Release);
    }

    /// Enters `Connecting` until the returned guard is resolved or dropped.
    pub(crate) fn dialing(&self) -> DialGuard<'_> {
        self.set(ConnectionState::Connecting);
        DialGuard {
            tracker: self,
            done: false,
        }
    }

    /// Records a freshly built connection.
    fn mark_connected(&self) {
        self.set(ConnectionState::Connected);
        self.connects.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn connects(&self) -> u64 {
        self.connects.load(Ordering::Acquire)
    }

    fn encode(state: ConnectionState) -> u8 {
        match state {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Closed => 3,
        }
    }

    fn decode(encoded: u8) -> ConnectionState {
        match encoded {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Closed,
        }
    }
}

/// An in-flight dial.
///
/// Dropping it unresolved (a failed dial, or a caller that gave up mid-dial)
/// falls back to `Disconnected`, unless the state moved on meanwhile.
pub(crate) struct DialGuard<'a> {
    tracker: &'a StateTracker,
    done: bool,
}

impl DialGuard<'_> {
    pub(crate) fn connected(mut self) {
        self.tracker.mark_connected();
        self.done = true;
    }
}

impl Drop for DialGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.tracker.state.compare_exchange(
                StateTracker::encode(ConnectionState::Connecting),
                StateTracker::encode(ConnectionState::Disconnected),
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }
}

impl std::fmt::Debug for StateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTracker")
            .field("state", &self.state())
            .field("connects", &self.connects())
            .finish()
    }
}
