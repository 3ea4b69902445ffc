use crate::{
    clock::Timestamp,
    obs::sink::{self, MetricsEvent},
};
use std::{fmt, time::Duration};
use tracing::trace;

///
/// RequestCoalescer
///
/// Leading-edge throttle over logical time. A request is effective if no
/// request was effective yet, or if at least `min_interval` has elapsed
/// since the last effective one; every other request is dropped.
///
/// Only effective requests move the window. Time that moves backwards
/// counts as no time elapsed.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestCoalescer {
    last_emitted_at: Option<Timestamp>,
    min_interval: Duration,
}

impl RequestCoalescer {
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emitted_at: None,
            min_interval,
        }
    }

    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    #[must_use]
    pub const fn last_emitted_at(&self) -> Option<Timestamp> {
        self.last_emitted_at
    }

    /// Decide whether a request arriving at `now` is effective.
    pub fn submit(&mut self, now: Timestamp) -> bool {
        let effective = self
            .last_emitted_at
            .is_none_or(|last| now.saturating_since(last) >= self.min_interval);

        if effective {
            self.last_emitted_at = Some(now);
        }

        effective
    }
}

///
/// RequestGate
///
/// A `RequestCoalescer` in front of a fetch. Effective requests run the
/// fetch and return its result; dropped requests never reach it.
///

pub struct RequestGate<Q, T> {
    coalescer: RequestCoalescer,
    fetch: Box<dyn FnMut(Q) -> T>,
}

impl<Q, T> RequestGate<Q, T> {
    #[must_use]
    pub fn new(min_interval: Duration, fetch: impl FnMut(Q) -> T + 'static) -> Self {
        Self {
            coalescer: RequestCoalescer::new(min_interval),
            fetch: Box::new(fetch),
        }
    }

    #[must_use]
    pub const fn coalescer(&self) -> &RequestCoalescer {
        &self.coalescer
    }

    /// Submit `request` at `now`; `None` if it was coalesced away.
    pub fn submit(&mut self, request: Q, now: Timestamp) -> Option<T> {
        let effective = self.coalescer.submit(now);
        sink::record(MetricsEvent::Request { effective });

        if effective {
            Some((self.fetch)(request))
        } else {
            trace!(%now, "request coalesced");
            None
        }
    }
}

impl<Q, T> fmt::Debug for RequestGate<Q, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGate")
            .field("coalescer", &self.coalescer)
            .finish_non_exhaustive()
    }
}
