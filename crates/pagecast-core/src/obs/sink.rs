//! Metrics sink boundary.
//!
//! Store and stream logic MUST NOT touch obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// StreamOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    Failed,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    StoreLoad {
        path: &'static str,
        records: u64,
        ok: bool,
    },
    PageServed {
        path: &'static str,
        records: u64,
    },
    Tick {
        path: &'static str,
        coalesced: bool,
    },
    Request {
        effective: bool,
    },
    StreamFinish {
        path: &'static str,
        outcome: StreamOutcome,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::StoreLoad { path, records, ok } => {
                let entry = m.paths.entry(path.to_string()).or_default();
                if ok {
                    m.ops.store_loads = m.ops.store_loads.saturating_add(1);
                    m.ops.records_loaded = m.ops.records_loaded.saturating_add(records);
                    entry.store_loads = entry.store_loads.saturating_add(1);
                    entry.records_loaded = entry.records_loaded.saturating_add(records);
                } else {
                    m.ops.store_load_failures = m.ops.store_load_failures.saturating_add(1);
                    entry.store_load_failures = entry.store_load_failures.saturating_add(1);
                }
            }

            MetricsEvent::PageServed { path, records } => {
                let empty = u64::from(records == 0);
                m.ops.pages_served = m.ops.pages_served.saturating_add(1);
                m.ops.empty_pages = m.ops.empty_pages.saturating_add(empty);
                m.ops.records_served = m.ops.records_served.saturating_add(records);

                let entry = m.paths.entry(path.to_string()).or_default();
                entry.pages_served = entry.pages_served.saturating_add(1);
                entry.empty_pages = entry.empty_pages.saturating_add(empty);
                entry.records_served = entry.records_served.saturating_add(records);
            }

            MetricsEvent::Tick { path, coalesced } => {
                let entry = m.paths.entry(path.to_string()).or_default();
                if coalesced {
                    m.ops.ticks_coalesced = m.ops.ticks_coalesced.saturating_add(1);
                    entry.ticks_coalesced = entry.ticks_coalesced.saturating_add(1);
                } else {
                    m.ops.ticks_fired = m.ops.ticks_fired.saturating_add(1);
                    entry.ticks_fired = entry.ticks_fired.saturating_add(1);
                }
            }

            MetricsEvent::Request { effective } => {
                if effective {
                    m.ops.requests_effective = m.ops.requests_effective.saturating_add(1);
                } else {
                    m.ops.requests_dropped = m.ops.requests_dropped.saturating_add(1);
                }
            }

            MetricsEvent::StreamFinish { outcome, .. } => match outcome {
                StreamOutcome::Completed => {
                    m.ops.streams_completed = m.ops.streams_completed.saturating_add(1);
                }
                StreamOutcome::Cancelled => {
                    m.ops.streams_cancelled = m.ops.streams_cancelled.saturating_add(1);
                }
                StreamOutcome::Failed => {
                    m.ops.streams_failed = m.ops.streams_failed.saturating_add(1);
                }
            },
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    // Clone out of the slot so a sink may itself record without re-borrowing.
    let override_sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match override_sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state for reporting and tests.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}
