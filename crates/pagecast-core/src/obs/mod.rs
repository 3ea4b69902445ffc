//! Observability: runtime counters and the sink they are recorded through.
//!
//! Counters are thread-local; a store loaded on another thread records its
//! load on that thread.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, PathCounters};
pub use sink::{
    MetricsEvent, MetricsSink, StreamOutcome, metrics_report, metrics_reset_all,
    with_metrics_sink,
};
