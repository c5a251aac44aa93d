//! Cancellable timer registry
//!
//! Arms deferred callbacks on a host [`Scheduler`] and keeps every outstanding
//! handle so a whole batch can be cancelled at once.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;

/// Host deferred-execution primitive.
pub trait Scheduler {
    type Token;

    /// Run `callback` once, no sooner than `delay` from now.
    ///
    /// Implementations may run a zero-delay callback before returning; the
    /// returned token is then never cancelled.
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> Self::Token;

    /// Cancel a scheduled callback. Cancelling a fired or cancelled token is a no-op.
    fn cancel(&self, token: Self::Token);
}

/// Scheduler backed by tokio local tasks.
///
/// Must be used from within a [`tokio::task::LocalSet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScheduler;

impl Scheduler for LocalScheduler {
    type Token = AbortHandle;

    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> AbortHandle {
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            callback();
        })
        .abort_handle()
    }

    fn cancel(&self, token: AbortHandle) {
        token.abort();
    }
}

/// Identifier of one armed callback, unique within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Live<T> {
    next_id: u64,
    handles: HashMap<TimerId, T>,
}

/// Tracks outstanding callbacks armed on a [`Scheduler`].
///
/// Clones share the same live-handle mapping, which lets a callback hold
/// the registry and cancel its siblings.
pub struct TimerRegistry<S: Scheduler> {
    scheduler: S,
    live: Rc<RefCell<Live<S::Token>>>,
}

impl<S: Scheduler + Clone> Clone for TimerRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            live: Rc::clone(&self.live),
        }
    }
}

impl<S: Scheduler> TimerRegistry<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            live: Rc::new(RefCell::new(Live {
                next_id: 0,
                handles: HashMap::new(),
            })),
        }
    }

    /// Arm `callback` to run once after `delay`.
    pub fn arm(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId
    where
        S::Token: 'static,
    {
        let id = {
            let mut live = self.live.borrow_mut();
            let id = TimerId(live.next_id);
            live.next_id += 1;
            id
        };

        let live: Weak<RefCell<Live<S::Token>>> = Rc::downgrade(&self.live);
        let fired = Rc::new(Cell::new(false));
        let fired_flag = Rc::clone(&fired);
        let token = self.scheduler.schedule(
            delay,
            Box::new(move || {
                fired_flag.set(true);
                // The entry goes first so a cancel_all from inside the callback skips it.
                if let Some(live) = live.upgrade() {
                    live.borrow_mut().handles.remove(&id);
                }
                tracing::debug!(timer = %id, "timer fired");
                callback();
            }),
        );

        if fired.get() {
            tracing::debug!(timer = %id, "timer fired while arming");
        } else {
            self.live.borrow_mut().handles.insert(id, token);
            tracing::debug!(timer = %id, ?delay, "timer armed");
        }
        id
    }

    /// Cancel every outstanding callback. Safe to call repeatedly.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.live.borrow_mut().handles.drain().collect();
        if drained.is_empty() {
            return;
        }
        tracing::debug!(count = drained.len(), "cancelling timers");
        for (_, token) in drained {
            self.scheduler.cancel(token);
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().handles.len()
    }

    pub fn is_idle(&self) -> bool {
        self.live_count() == 0
    }
}
