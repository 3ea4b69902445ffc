//! Clock-driven page streams: the interval batcher, its composition
//! policies, and request coalescing.
//!
//! Every source here is cold: building one has no side effects, and
//! nothing is scheduled until `subscribe`. Emissions are only ever
//! delivered from inside `LogicalClock::advance_*`.

mod coalesce;
mod compose;
mod interval;


pub use coalesce::{RequestCoalescer, RequestGate};
pub use compose::{Concat, FallbackChain, LatestPair, LatestWins, SharedSource};
pub use interval::IntervalBatcher;

use crate::{
    clock::{LogicalClock, Timestamp},
    error::LoadError,
};
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

///
/// Emission
///
/// One notification delivered to an observer.
/// `Completed` and `Failed` are terminal; nothing follows them.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Emission<T> {
    Next(T),
    Completed,
    Failed(LoadError),
}

impl<T> Emission<T> {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// Callback receiving a stream's emissions.
pub type Observer<T> = Box<dyn FnMut(Emission<T>)>;

pub(crate) type SharedObserver<T> = Rc<RefCell<Observer<T>>>;

pub(crate) fn share<T>(observer: Observer<T>) -> SharedObserver<T> {
    Rc::new(RefCell::new(observer))
}

pub(crate) fn emit<T>(observer: &SharedObserver<T>, emission: Emission<T>) {
    (observer.borrow_mut())(emission);
}

///
/// PageSource
///
/// A cold stream description. `subscribe` starts one independent run
/// against `clock` and returns the handle that cancels it.
///

pub trait PageSource<T> {
    fn subscribe(&self, clock: &LogicalClock, observer: Observer<T>) -> Subscription;
}

impl<T, S: PageSource<T> + ?Sized> PageSource<T> for Rc<S> {
    fn subscribe(&self, clock: &LogicalClock, observer: Observer<T>) -> Subscription {
        (**self).subscribe(clock, observer)
    }
}

///
/// Subscription
///
/// Handle for one running stream. Cancelling deregisters the pending tick;
/// no emissions follow. Closed once cancelled or once the stream terminated.
///

#[derive(Clone)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

struct SubscriptionInner {
    closed: Cell<bool>,
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    pub(crate) fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                closed: Cell::new(false),
                teardown: RefCell::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// Stop the stream. Idempotent; a no-op once the stream terminated.
    pub fn cancel(&self) {
        if self.inner.closed.replace(true) {
            return;
        }

        let teardown = self.inner.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    pub(crate) fn downgrade(&self) -> SubscriptionHandle {
        SubscriptionHandle(Rc::downgrade(&self.inner))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

///
/// SubscriptionHandle
///
/// Weak back-reference a running stream uses to mark its own subscription
/// closed when it terminates on its own.
///

#[derive(Default)]
pub(crate) struct SubscriptionHandle(Weak<SubscriptionInner>);

impl SubscriptionHandle {
    pub(crate) fn close(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.closed.set(true);
            let teardown = inner.teardown.borrow_mut().take();
            drop(teardown);
        }
    }
}

///
/// Recorded
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Recorded<T> {
    pub at: Timestamp,
    pub emission: Emission<T>,
}

///
/// Recorder
///
/// Observer that keeps every emission with the logical time it arrived.
/// Clones share one log.
///

pub struct Recorder<T> {
    clock: LogicalClock,
    log: Rc<RefCell<Vec<Recorded<T>>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            clock: self.clock.clone(),
            log: Rc::clone(&self.log),
        }
    }
}

impl<T: Clone + 'static> Recorder<T> {
    #[must_use]
    pub fn new(clock: &LogicalClock) -> Self {
        Self {
            clock: clock.clone(),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Observer that appends to this recorder.
    #[must_use]
    pub fn observer(&self) -> Observer<T> {
        let recorder = self.clone();

        Box::new(move |emission| {
            let at = recorder.clock.now();
            recorder.log.borrow_mut().push(Recorded { at, emission });
        })
    }

    #[must_use]
    pub fn emissions(&self) -> Vec<Recorded<T>> {
        self.log.borrow().clone()
    }

    /// Values of every `Next`, in arrival order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.log
            .borrow()
            .iter()
            .filter_map(|recorded| match &recorded.emission {
                Emission::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Arrival times of every `Next`.
    #[must_use]
    pub fn value_times(&self) -> Vec<Timestamp> {
        self.log
            .borrow()
            .iter()
            .filter(|recorded| matches!(recorded.emission, Emission::Next(_)))
            .map(|recorded| recorded.at)
            .collect()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.log
            .borrow()
            .iter()
            .any(|recorded| matches!(recorded.emission, Emission::Completed))
    }

    #[must_use]
    pub fn failure(&self) -> Option<LoadError> {
        self.log
            .borrow()
            .iter()
            .find_map(|recorded| match &recorded.emission {
                Emission::Failed(err) => Some(err.clone()),
                _ => None,
            })
    }

    /// Time of the terminal emission, if any arrived.
    #[must_use]
    pub fn terminated_at(&self) -> Option<Timestamp> {
        self.log
            .borrow()
            .iter()
            .find(|recorded| recorded.emission.is_terminal())
            .map(|recorded| recorded.at)
    }
}
