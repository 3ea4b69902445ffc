//! Module: clock
//! Responsibility: virtual time and the continuations scheduled against it.
//! Does not own: what the continuations do (see `stream`).
//! Boundary: every time-dependent component receives a `LogicalClock`
//! explicitly; there is no ambient timer.

use serde::Serialize;
use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc, time::Duration};
use tracing::trace;

///
/// Timestamp
///
/// Point on a logical clock, in milliseconds since the clock was created.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn saturating_add(self, delta: Duration) -> Self {
        let millis = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);

        Self(self.0.saturating_add(millis))
    }

    /// Time elapsed since `earlier`; zero if `earlier` is in the future.
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

///
/// TimerId
///
/// Handle for one pending continuation; used to cancel it.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimerId {
    due: Timestamp,
    seq: u64,
}

impl TimerId {
    #[must_use]
    pub const fn due(&self) -> Timestamp {
        self.due
    }
}

type Task = Box<dyn FnOnce(&LogicalClock)>;

#[derive(Default)]
struct ClockState {
    now: Timestamp,
    next_seq: u64,
    pending: BTreeMap<TimerId, Task>,
}

///
/// LogicalClock
///
/// Deterministic, explicitly advanced scheduler.
///
/// Continuations run only inside `advance_*`, ordered by due time and then
/// by registration order. A continuation may schedule further ones; those
/// due within the current advance run in the same call. Clones share one
/// timeline. Single-threaded by construction.
///

#[derive(Clone, Default)]
pub struct LogicalClock {
    state: Rc<RefCell<ClockState>>,
}

impl LogicalClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.state.borrow().now
    }

    /// Number of continuations still waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Register `task` to run when the clock reaches `due`.
    /// A due time in the past runs at the next advance.
    pub fn schedule_at(&self, due: Timestamp, task: impl FnOnce(&Self) + 'static) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = TimerId {
            due: due.max(state.now),
            seq: state.next_seq,
        };
        state.next_seq = state.next_seq.saturating_add(1);
        state.pending.insert(id, Box::new(task));

        id
    }

    /// Register `task` to run `delay` after the current time.
    pub fn schedule_after(&self, delay: Duration, task: impl FnOnce(&Self) + 'static) -> TimerId {
        let due = self.now().saturating_add(delay);

        self.schedule_at(due, task)
    }

    /// Deregister a pending continuation. Returns false if it already ran
    /// or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.state.borrow_mut().pending.remove(&id).is_some()
    }

    /// Advance by `delta`, running every continuation that falls due.
    /// Returns the number of continuations run.
    pub fn advance_by(&self, delta: Duration) -> usize {
        let target = self.now().saturating_add(delta);

        self.advance_to(target)
    }

    /// Advance to `target`, running every continuation that falls due.
    /// Moving backwards is a no-op. Returns the number of continuations run.
    pub fn advance_to(&self, target: Timestamp) -> usize {
        let mut ran = 0;

        loop {
            // The borrow must end before the task runs; tasks reschedule.
            let next = {
                let mut state = self.state.borrow_mut();
                let is_due = state
                    .pending
                    .first_key_value()
                    .is_some_and(|(id, _)| id.due <= target);
                let next = if is_due { state.pending.pop_first() } else { None };
                if let Some((id, _)) = &next {
                    state.now = state.now.max(id.due);
                }

                next
            };

            let Some((id, task)) = next else {
                break;
            };

            trace!(due = %id.due, seq = id.seq, "clock continuation");
            task(self);
            ran += 1;
        }

        let mut state = self.state.borrow_mut();
        state.now = state.now.max(target);

        ran
    }
}

impl fmt::Debug for LogicalClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();

        f.debug_struct("LogicalClock")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn log() -> Rc<RefCell<Vec<(u64, &'static str)>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn push(
        log: &Rc<RefCell<Vec<(u64, &'static str)>>>,
        label: &'static str,
    ) -> Box<dyn FnOnce(&LogicalClock)> {
        let log = Rc::clone(log);
        Box::new(move |clock| log.borrow_mut().push((clock.now().as_millis(), label)))
    }

    #[test]
    fn runs_in_due_then_registration_order() {
        let clock = LogicalClock::new();
        let seen = log();

        clock.schedule_at(Timestamp::from_millis(20), push(&seen, "late"));
        clock.schedule_at(Timestamp::from_millis(10), push(&seen, "first"));
        clock.schedule_at(Timestamp::from_millis(10), push(&seen, "second"));

        assert_eq!(clock.advance_by(Duration::from_millis(25)), 3);
        assert_eq!(
            *seen.borrow(),
            vec![(10, "first"), (10, "second"), (20, "late")]
        );
        assert_eq!(clock.now(), Timestamp::from_millis(25));
    }

    #[test]
    fn nothing_runs_before_due() {
        let clock = LogicalClock::new();
        let seen = log();
        clock.schedule_after(Duration::from_millis(5), push(&seen, "tick"));

        assert_eq!(clock.advance_by(Duration::from_millis(4)), 0);
        assert!(seen.borrow().is_empty());
        assert_eq!(clock.advance_by(Duration::from_millis(1)), 1);
    }

    #[test]
    fn cancelled_continuations_never_run() {
        let clock = LogicalClock::new();
        let seen = log();
        let id = clock.schedule_after(Duration::from_millis(5), push(&seen, "tick"));

        assert!(clock.cancel(id));
        assert!(!clock.cancel(id), "second cancel is a no-op");
        clock.advance_by(Duration::from_secs(1));

        assert!(seen.borrow().is_empty());
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn continuations_may_reschedule_within_one_advance() {
        fn every_ten(log: Rc<RefCell<Vec<u64>>>, remaining: u32) -> Box<dyn FnOnce(&LogicalClock)> {
            Box::new(move |clock| {
                log.borrow_mut().push(clock.now().as_millis());
                if remaining > 1 {
                    clock.schedule_after(
                        Duration::from_millis(10),
                        every_ten(Rc::clone(&log), remaining - 1),
                    );
                }
            })
        }

        let clock = LogicalClock::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        clock.schedule_after(Duration::from_millis(10), every_ten(Rc::clone(&seen), 4));

        clock.advance_to(Timestamp::from_millis(35));
        assert_eq!(*seen.borrow(), vec![10, 20, 30]);

        clock.advance_to(Timestamp::from_millis(100));
        assert_eq!(*seen.borrow(), vec![10, 20, 30, 40]);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn past_due_times_run_at_next_advance() {
        let clock = LogicalClock::new();
        let seen = log();
        clock.advance_to(Timestamp::from_millis(50));

        let id = clock.schedule_at(Timestamp::from_millis(10), push(&seen, "late"));
        assert_eq!(id.due(), Timestamp::from_millis(50));

        clock.advance_by(Duration::ZERO);
        assert_eq!(*seen.borrow(), vec![(50, "late")]);
    }

    #[test]
    fn advancing_backwards_keeps_time() {
        let clock = LogicalClock::new();
        clock.advance_to(Timestamp::from_millis(30));
        clock.advance_to(Timestamp::from_millis(10));

        assert_eq!(clock.now(), Timestamp::from_millis(30));
    }
}
