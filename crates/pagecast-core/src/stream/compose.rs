//! Composition policies over page streams.
//!
//! All three are cold: subscribing subscribes the children (eagerly for
//! latest-wins, one at a time for the other two). Cancelling a composite
//! cancels whichever children are still running.

use crate::{
    clock::LogicalClock,
    db::Page,
    stream::{
        Emission, Observer, PageSource, SharedObserver, Subscription, SubscriptionHandle, emit,
        share,
    },
    traits::Record,
};
use serde::Serialize;
use std::{cell::RefCell, fmt, mem, rc::Rc, time::Duration};
use tracing::debug;

/// Shared, type-erased page stream; the element type of N-way composites.
pub type SharedSource<R> = Rc<dyn PageSource<Page<R>>>;

///
/// LatestPair
///
/// One latest-wins emission: the most recent non-empty page from each side.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LatestPair<R> {
    pub left: Page<R>,
    pub right: Page<R>,
}

impl<R> LatestPair<R> {
    /// Left records, then right records.
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.left.iter().chain(self.right.iter())
    }

    #[must_use]
    pub fn into_records(self) -> Vec<R> {
        let mut records = self.left.into_records();
        records.extend(self.right.into_records());
        records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

///
/// LatestWins
///
/// Runs both sides concurrently. Once each side has produced a non-empty
/// page, every further non-empty page from either side emits the pair of
/// latest pages, so one side's page repeats while the other keeps moving.
/// Empty pages never replace a side's latest page.
///
/// Completes when both sides complete. A failure on either side is
/// forwarded and cancels the other.
///

pub struct LatestWins<R> {
    left: SharedSource<R>,
    right: SharedSource<R>,
}

impl<R: Record> LatestWins<R> {
    #[must_use]
    pub fn new(
        left: impl PageSource<Page<R>> + 'static,
        right: impl PageSource<Page<R>> + 'static,
    ) -> Self {
        Self {
            left: Rc::new(left),
            right: Rc::new(right),
        }
    }
}

impl<R> fmt::Debug for LatestWins<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatestWins").finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Side {
    Left,
    Right,
}

struct LatestState<R> {
    left: Option<Page<R>>,
    right: Option<Page<R>>,
    left_done: bool,
    right_done: bool,
    finished: bool,
    left_sub: Option<Subscription>,
    right_sub: Option<Subscription>,
    handle: SubscriptionHandle,
}

impl<R> Default for LatestState<R> {
    fn default() -> Self {
        Self {
            left: None,
            right: None,
            left_done: false,
            right_done: false,
            finished: false,
            left_sub: None,
            right_sub: None,
            handle: SubscriptionHandle::default(),
        }
    }
}

impl<R: Record> PageSource<LatestPair<R>> for LatestWins<R> {
    fn subscribe(&self, clock: &LogicalClock, observer: Observer<LatestPair<R>>) -> Subscription {
        let state = Rc::new(RefCell::new(LatestState::default()));
        let downstream = share(observer);

        let left = self
            .left
            .subscribe(clock, latest_side(Side::Left, &state, &downstream));
        let right = self
            .right
            .subscribe(clock, latest_side(Side::Right, &state, &downstream));

        {
            let mut state = state.borrow_mut();
            state.left_sub = Some(left);
            state.right_sub = Some(right);
        }

        let teardown_state = Rc::clone(&state);
        let subscription = Subscription::new(move || {
            let children = {
                let mut state = teardown_state.borrow_mut();
                state.finished = true;
                [state.left_sub.take(), state.right_sub.take()]
            };
            for child in children.into_iter().flatten() {
                child.cancel();
            }
        });
        state.borrow_mut().handle = subscription.downgrade();

        subscription
    }
}

fn latest_side<R: Record>(
    side: Side,
    state: &Rc<RefCell<LatestState<R>>>,
    downstream: &SharedObserver<LatestPair<R>>,
) -> Observer<Page<R>> {
    let state = Rc::clone(state);
    let downstream = Rc::clone(downstream);

    Box::new(move |emission| {
        let (out, cancel_other) = {
            let mut state = state.borrow_mut();
            if state.finished {
                return;
            }

            match emission {
                Emission::Next(page) if page.is_empty() => (None, None),
                Emission::Next(page) => {
                    match side {
                        Side::Left => state.left = Some(page),
                        Side::Right => state.right = Some(page),
                    }
                    let pair = match (&state.left, &state.right) {
                        (Some(left), Some(right)) => Some(LatestPair {
                            left: left.clone(),
                            right: right.clone(),
                        }),
                        _ => None,
                    };

                    (pair.map(Emission::Next), None)
                }
                Emission::Completed => {
                    match side {
                        Side::Left => {
                            state.left_done = true;
                            state.left_sub = None;
                        }
                        Side::Right => {
                            state.right_done = true;
                            state.right_sub = None;
                        }
                    }
                    if state.left_done && state.right_done {
                        state.finished = true;
                        (Some(Emission::Completed), None)
                    } else {
                        (None, None)
                    }
                }
                Emission::Failed(err) => {
                    state.finished = true;
                    let other = match side {
                        Side::Left => {
                            state.left_sub = None;
                            state.right_sub.take()
                        }
                        Side::Right => {
                            state.right_sub = None;
                            state.left_sub.take()
                        }
                    };

                    (Some(Emission::Failed(err)), other)
                }
            }
        };

        if let Some(other) = cancel_other {
            other.cancel();
        }

        if let Some(emission) = out {
            let terminal = emission.is_terminal();
            emit(&downstream, emission);
            if terminal {
                let handle = mem::take(&mut state.borrow_mut().handle);
                handle.close();
                debug!("latest-wins stream finished");
            }
        }
    })
}

///
/// Concat
///
/// Runs sources strictly one after another; a later source is not
/// subscribed until the one before it completes. Each non-final source's
/// terminal empty page is absorbed, so exactly one empty page (the last
/// source's) reaches the observer. A failure stops the chain.
///

pub struct Concat<R> {
    sources: Rc<[SharedSource<R>]>,
}

impl<R: Record> Concat<R> {
    #[must_use]
    pub fn new(sources: Vec<SharedSource<R>>) -> Self {
        Self {
            sources: sources.into(),
        }
    }

    #[must_use]
    pub fn pair(
        first: impl PageSource<Page<R>> + 'static,
        second: impl PageSource<Page<R>> + 'static,
    ) -> Self {
        let first: SharedSource<R> = Rc::new(first);
        let second: SharedSource<R> = Rc::new(second);

        Self::new(vec![first, second])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<R> fmt::Debug for Concat<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Concat")
            .field("sources", &self.sources.len())
            .finish()
    }
}

///
/// ChainState
///
/// Shared by `Concat` and `FallbackChain`: which source is live and the
/// subscription that stops it.
///

#[derive(Default)]
struct ChainState {
    index: usize,
    current: Option<Subscription>,
    committed: bool,
    finished: bool,
    handle: SubscriptionHandle,
}

impl ChainState {
    fn finish(&mut self) -> SubscriptionHandle {
        self.finished = true;
        self.current = None;
        mem::take(&mut self.handle)
    }
}

/// Subscription for a chain whose live child changes over time.
fn chain_subscription(state: &Rc<RefCell<ChainState>>) -> Subscription {
    let teardown_state = Rc::clone(state);
    let subscription = Subscription::new(move || {
        let current = {
            let mut state = teardown_state.borrow_mut();
            state.finished = true;
            state.current.take()
        };
        if let Some(current) = current {
            current.cancel();
        }
    });
    state.borrow_mut().handle = subscription.downgrade();

    subscription
}

/// An empty chain has nothing to run; it completes on the next advance.
fn complete_empty_chain<R: 'static>(
    clock: &LogicalClock,
    state: &Rc<RefCell<ChainState>>,
    downstream: &SharedObserver<Page<R>>,
) {
    let state = Rc::clone(state);
    let downstream = Rc::clone(downstream);

    clock.schedule_after(Duration::ZERO, move |_| {
        if state.borrow().finished {
            return;
        }
        let handle = state.borrow_mut().finish();
        emit(&downstream, Emission::Completed);
        handle.close();
    });
}

impl<R: Record> PageSource<Page<R>> for Concat<R> {
    fn subscribe(&self, clock: &LogicalClock, observer: Observer<Page<R>>) -> Subscription {
        let state = Rc::new(RefCell::new(ChainState::default()));
        let downstream = share(observer);
        let subscription = chain_subscription(&state);

        if self.sources.is_empty() {
            complete_empty_chain(clock, &state, &downstream);
        } else {
            concat_from(Rc::clone(&self.sources), 0, clock, &state, &downstream);
        }

        subscription
    }
}

fn concat_from<R: Record>(
    sources: Rc<[SharedSource<R>]>,
    index: usize,
    clock: &LogicalClock,
    state: &Rc<RefCell<ChainState>>,
    downstream: &SharedObserver<Page<R>>,
) {
    let last = index + 1 == sources.len();
    let source = Rc::clone(&sources[index]);
    state.borrow_mut().index = index;

    let observer: Observer<Page<R>> = {
        let clock = clock.clone();
        let state = Rc::clone(state);
        let downstream = Rc::clone(downstream);

        Box::new(move |emission| {
            {
                let state = state.borrow();
                if state.finished || state.index != index {
                    return;
                }
            }

            match emission {
                Emission::Next(page) if page.is_empty() && !last => {}
                Emission::Next(page) => emit(&downstream, Emission::Next(page)),
                Emission::Completed if !last => {
                    debug!(next = index + 1, "concat advancing to next source");
                    state.borrow_mut().current = None;
                    concat_from(Rc::clone(&sources), index + 1, &clock, &state, &downstream);
                }
                terminal => {
                    let handle = state.borrow_mut().finish();
                    emit(&downstream, terminal);
                    handle.close();
                }
            }
        })
    };

    let subscription = source.subscribe(clock, observer);
    let mut state = state.borrow_mut();
    if state.finished || state.index != index {
        drop(state);
        subscription.cancel();
    } else {
        state.current = Some(subscription);
    }
}

///
/// FallbackChain
///
/// Tries sources in order. A source whose first observation is an empty
/// page (or a completion with no page at all) is cancelled and the next
/// one is subscribed. The first source to produce a non-empty page is
/// forwarded to the end. If every source is empty, the last one's empty
/// page and completion are forwarded.
///

pub struct FallbackChain<R> {
    sources: Rc<[SharedSource<R>]>,
}

impl<R: Record> FallbackChain<R> {
    #[must_use]
    pub fn new(sources: Vec<SharedSource<R>>) -> Self {
        Self {
            sources: sources.into(),
        }
    }

    /// Append one more fallback.
    #[must_use]
    pub fn or_else(self, source: impl PageSource<Page<R>> + 'static) -> Self {
        let mut sources = self.sources.to_vec();
        sources.push(Rc::new(source));

        Self::new(sources)
    }
}

impl<R> fmt::Debug for FallbackChain<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackChain")
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl<R: Record> PageSource<Page<R>> for FallbackChain<R> {
    fn subscribe(&self, clock: &LogicalClock, observer: Observer<Page<R>>) -> Subscription {
        let state = Rc::new(RefCell::new(ChainState::default()));
        let downstream = share(observer);
        let subscription = chain_subscription(&state);

        if self.sources.is_empty() {
            complete_empty_chain(clock, &state, &downstream);
        } else {
            fallback_from(Rc::clone(&self.sources), 0, clock, &state, &downstream);
        }

        subscription
    }
}

fn fallback_from<R: Record>(
    sources: Rc<[SharedSource<R>]>,
    index: usize,
    clock: &LogicalClock,
    state: &Rc<RefCell<ChainState>>,
    downstream: &SharedObserver<Page<R>>,
) {
    let last = index + 1 == sources.len();
    let source = Rc::clone(&sources[index]);
    state.borrow_mut().index = index;

    let observer: Observer<Page<R>> = {
        let clock = clock.clone();
        let state = Rc::clone(state);
        let downstream = Rc::clone(downstream);

        Box::new(move |emission| {
            let committed = {
                let state = state.borrow();
                if state.finished || state.index != index {
                    return;
                }
                state.committed
            };

            let empty_first = match &emission {
                Emission::Next(page) => !committed && page.is_empty(),
                Emission::Completed => !committed,
                Emission::Failed(_) => false,
            };

            if empty_first && !last {
                debug!(next = index + 1, "fallback source empty; trying next");
                let abandoned = state.borrow_mut().current.take();
                if let Some(abandoned) = abandoned {
                    abandoned.cancel();
                }
                fallback_from(Rc::clone(&sources), index + 1, &clock, &state, &downstream);
                return;
            }

            match emission {
                Emission::Next(page) => {
                    state.borrow_mut().committed = true;
                    emit(&downstream, Emission::Next(page));
                }
                terminal => {
                    let handle = state.borrow_mut().finish();
                    emit(&downstream, terminal);
                    handle.close();
                }
            }
        })
    };

    let subscription = source.subscribe(clock, observer);
    let mut state = state.borrow_mut();
    if state.finished || state.index != index {
        drop(state);
        subscription.cancel();
    } else {
        state.current = Some(subscription);
    }
}
