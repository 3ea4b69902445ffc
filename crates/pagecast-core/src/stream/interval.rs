use crate::{
    MIN_TICK_MS,
    clock::{LogicalClock, TimerId},
    db::{Page, PaginationCursor, RecordStore},
    error::LoadError,
    obs::sink::{self, MetricsEvent, StreamOutcome},
    stream::{
        Emission, Observer, PageSource, RequestCoalescer, SharedObserver, Subscription,
        SubscriptionHandle, emit, share,
    },
    traits::Record,
};
use std::{cell::RefCell, fmt, rc::Rc, sync::Arc, time::Duration};
use tracing::{debug, info, trace, warn};

///
/// IntervalBatcher
///
/// Cold, periodic page stream: one page per tick, `every` apart, the first
/// tick one interval after subscribe. The tick that resolves an empty page
/// emits it and then completes.
///
/// Each subscription owns its own cursor, so subscribing twice replays the
/// sequence from the beginning.
///

pub struct IntervalBatcher<R: Record> {
    store: Arc<RecordStore<R>>,
    page_size: usize,
    every: Duration,
    start: usize,
    end: Option<usize>,
    coalesce: Option<Duration>,
}

impl<R: Record> IntervalBatcher<R> {
    /// A zero interval is raised to `MIN_TICK_MS`.
    #[must_use]
    pub fn new(store: Arc<RecordStore<R>>, page_size: usize, every: Duration) -> Self {
        Self {
            store,
            page_size,
            every: every.max(Duration::from_millis(MIN_TICK_MS)),
            start: 0,
            end: None,
            coalesce: None,
        }
    }

    /// Restrict the stream to the raw window `[start, end)`.
    #[must_use]
    pub const fn window(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = Some(end);
        self
    }

    /// Skip ticks that arrive sooner than `min_interval` after the last
    /// emitted page. A skipped tick does not advance the cursor.
    #[must_use]
    pub const fn coalesced(mut self, min_interval: Duration) -> Self {
        self.coalesce = Some(min_interval);
        self
    }

    #[must_use]
    pub const fn every(&self) -> Duration {
        self.every
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }
}

impl<R: Record> Clone for IntervalBatcher<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ..*self
        }
    }
}

impl<R: Record> fmt::Debug for IntervalBatcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalBatcher")
            .field("path", &R::PATH)
            .field("page_size", &self.page_size)
            .field("every", &self.every)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("coalesce", &self.coalesce)
            .finish()
    }
}

impl<R: Record> PageSource<Page<R>> for IntervalBatcher<R> {
    fn subscribe(&self, clock: &LogicalClock, observer: Observer<Page<R>>) -> Subscription {
        let run = Rc::new(RefCell::new(BatchRun {
            store: Arc::clone(&self.store),
            cursor: PaginationCursor::with_origin(self.start, self.page_size),
            limit: self.end,
            every: self.every,
            coalescer: self.coalesce.map(RequestCoalescer::new),
            timer: None,
            status: RunStatus::Active,
            handle: SubscriptionHandle::default(),
        }));
        let observer = share(observer);

        debug!(
            path = R::PATH,
            page_size = self.page_size,
            every_ms = self.every.as_millis(),
            "interval stream subscribed"
        );
        schedule_tick(clock, &run, &observer);

        let teardown_run = Rc::clone(&run);
        let teardown_clock = clock.clone();
        let subscription = Subscription::new(move || {
            let timer = {
                let mut run = teardown_run.borrow_mut();
                if run.status != RunStatus::Active {
                    return;
                }
                run.status = RunStatus::Cancelled;
                run.timer.take()
            };
            if let Some(timer) = timer {
                teardown_clock.cancel(timer);
            }

            debug!(path = R::PATH, "interval stream cancelled");
            sink::record(MetricsEvent::StreamFinish {
                path: R::PATH,
                outcome: StreamOutcome::Cancelled,
            });
        });
        run.borrow_mut().handle = subscription.downgrade();

        subscription
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RunStatus {
    Active,
    Finished,
    Cancelled,
}

struct BatchRun<R: Record> {
    store: Arc<RecordStore<R>>,
    cursor: PaginationCursor,
    limit: Option<usize>,
    every: Duration,
    coalescer: Option<RequestCoalescer>,
    timer: Option<TimerId>,
    status: RunStatus,
    handle: SubscriptionHandle,
}

fn schedule_tick<R: Record>(
    clock: &LogicalClock,
    run: &Rc<RefCell<BatchRun<R>>>,
    observer: &SharedObserver<Page<R>>,
) {
    let every = run.borrow().every;
    let task_run = Rc::clone(run);
    let task_observer = Rc::clone(observer);
    let timer = clock.schedule_after(every, move |clock| {
        tick(clock, &task_run, &task_observer);
    });

    run.borrow_mut().timer = Some(timer);
}

/// What one tick decided, computed with the run borrowed.
enum TickStep<R> {
    Skip,
    Page(Page<R>),
    Last(Page<R>),
    Fail(LoadError),
}

fn tick<R: Record>(
    clock: &LogicalClock,
    run: &Rc<RefCell<BatchRun<R>>>,
    observer: &SharedObserver<Page<R>>,
) {
    let step = {
        let mut run = run.borrow_mut();
        run.timer = None;
        if run.status != RunStatus::Active {
            return;
        }

        let now = clock.now();
        let admitted = run
            .coalescer
            .as_mut()
            .is_none_or(|coalescer| coalescer.submit(now));

        if admitted {
            sink::record(MetricsEvent::Tick {
                path: R::PATH,
                coalesced: false,
            });

            let (start, end) = run.cursor.window(run.limit);
            match run.store.get_page(start, end) {
                Err(err) => {
                    run.cursor.exhaust();
                    TickStep::Fail(err)
                }
                Ok(page) if page.is_empty() => {
                    run.cursor.exhaust();
                    TickStep::Last(page)
                }
                Ok(page) => {
                    run.cursor.advance();
                    TickStep::Page(page)
                }
            }
        } else {
            sink::record(MetricsEvent::Tick {
                path: R::PATH,
                coalesced: true,
            });
            TickStep::Skip
        }
    };

    let (emissions, outcome) = match step {
        TickStep::Skip => {
            trace!(path = R::PATH, now = %clock.now(), "tick coalesced");
            (Vec::new(), None)
        }
        TickStep::Page(page) => {
            trace!(path = R::PATH, now = %clock.now(), records = page.len(), "page emitted");
            (vec![Emission::Next(page)], None)
        }
        TickStep::Last(page) => (
            vec![Emission::Next(page), Emission::Completed],
            Some(StreamOutcome::Completed),
        ),
        TickStep::Fail(err) => {
            warn!(path = R::PATH, error = %err, "interval stream failed");
            (vec![Emission::Failed(err)], Some(StreamOutcome::Failed))
        }
    };

    for emission in emissions {
        // The observer may cancel between emissions.
        if run.borrow().status != RunStatus::Active {
            return;
        }
        emit(observer, emission);
    }

    if run.borrow().status != RunStatus::Active {
        return;
    }

    match outcome {
        Some(outcome) => {
            let handle = {
                let mut run = run.borrow_mut();
                run.status = RunStatus::Finished;
                std::mem::take(&mut run.handle)
            };
            handle.close();

            info!(path = R::PATH, ?outcome, "interval stream finished");
            sink::record(MetricsEvent::StreamFinish {
                path: R::PATH,
                outcome,
            });
        }
        None => schedule_tick(clock, run, observer),
    }
}
