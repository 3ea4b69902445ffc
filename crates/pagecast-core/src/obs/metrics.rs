use serde::Serialize;
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for store and stream activity.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub paths: BTreeMap<String, PathCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventOps {
    // Store loads
    pub store_loads: u64,
    pub store_load_failures: u64,
    pub records_loaded: u64,

    // Pages
    pub pages_served: u64,
    pub empty_pages: u64,
    pub records_served: u64,

    // Clock-driven streams
    pub ticks_fired: u64,
    pub ticks_coalesced: u64,
    pub streams_completed: u64,
    pub streams_cancelled: u64,
    pub streams_failed: u64,

    // Request gates
    pub requests_effective: u64,
    pub requests_dropped: u64,
}

///
/// PathCounters
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct PathCounters {
    pub store_loads: u64,
    pub store_load_failures: u64,
    pub records_loaded: u64,
    pub pages_served: u64,
    pub empty_pages: u64,
    pub records_served: u64,
    pub ticks_fired: u64,
    pub ticks_coalesced: u64,
}

///
/// EventReport
/// Point-in-time copy of the counters.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub paths: BTreeMap<String, PathCounters>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters (useful in tests).
pub fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot the current counters.
#[must_use]
pub fn report() -> EventReport {
    with_state(|m| EventReport {
        ops: m.ops.clone(),
        paths: m.paths.clone(),
    })
}
