//! # Timer Drivers
//!
//! Stage timeouts run on whatever clock the host provides. The policy only
//! needs to arm one timer and cancel it again; the driver decides what
//! "wall clock" means:
//!
//! - [`ManualTimers`]: a clock the caller advances by hand (tests, dry runs)
//! - [`TokioTimers`]: `tokio::time` on a `LocalSet` (feature `tokio`)
//! - the wasm bindings ship a `setTimeout` driver
//!
//! Everything is single-threaded, so callbacks are plain `FnOnce()`.

use std::cell::{Cell, RefCell};
use std::time::Duration;

/// Identifies an armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Callback run when a timer fires
pub type TimerCallback = Box<dyn FnOnce()>;

/// Source of one-shot timers
pub trait TimerDriver {
    /// Run `on_fire` once after `delay`, unless cancelled first
    fn arm(&self, delay: Duration, on_fire: TimerCallback) -> TimerHandle;

    /// Cancel an armed timer; unknown or already-fired handles are ignored
    fn cancel(&self, handle: TimerHandle);
}

struct PendingTimer {
    handle: TimerHandle,
    deadline: Duration,
    on_fire: TimerCallback,
}

/// Timers driven by an explicitly advanced clock
#[derive(Default)]
pub struct ManualTimers {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    pending: RefCell<Vec<PendingTimer>>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on this clock
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Move the clock forward, firing due timers in deadline order.
    /// Returns how many fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut fired = 0;

        loop {
            // The borrow must end before the callback runs: callbacks arm and
            // cancel timers on this driver.
            let next = {
                let mut pending = self.pending.borrow_mut();
                let due = pending
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.deadline <= target)
                    .min_by_key(|(_, t)| (t.deadline, t.handle.id()))
                    .map(|(i, _)| i);
                due.map(|i| pending.remove(i))
            };

            match next {
                Some(timer) => {
                    self.now.set(timer.deadline);
                    (timer.on_fire)();
                    fired += 1;
                }
                None => break,
            }
        }

        self.now.set(target);
        fired
    }
}

impl TimerDriver for ManualTimers {
    fn arm(&self, delay: Duration, on_fire: TimerCallback) -> TimerHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let handle = TimerHandle::new(id);

        self.pending.borrow_mut().push(PendingTimer {
            handle,
            deadline: self.now.get() + delay,
            on_fire,
        });
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.pending.borrow_mut().retain(|t| t.handle != handle);
    }
}

#[cfg(feature = "tokio")]
pub use self::tokio_driver::TokioTimers;

#[cfg(feature = "tokio")]
mod tokio_driver {
    use super::{TimerCallback, TimerDriver, TimerHandle};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    /// Timers backed by `tokio::time::sleep`.
    ///
    /// Tasks are spawned with `spawn_local`, so arming must happen inside a
    /// `tokio::task::LocalSet`.
    #[derive(Default)]
    pub struct TokioTimers {
        next_id: Cell<u64>,
        tasks: RefCell<HashMap<TimerHandle, JoinHandle<()>>>,
    }

    impl TokioTimers {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of timers still waiting to fire
        pub fn pending(&self) -> usize {
            self.tasks
                .borrow()
                .values()
                .filter(|task| !task.is_finished())
                .count()
        }
    }

    impl TimerDriver for TokioTimers {
        fn arm(&self, delay: Duration, on_fire: TimerCallback) -> TimerHandle {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            let handle = TimerHandle::new(id);

            let task = tokio::task::spawn_local(async move {
                tokio::time::sleep(delay).await;
                on_fire();
            });

            let mut tasks = self.tasks.borrow_mut();
            tasks.retain(|_, task| !task.is_finished());
            tasks.insert(handle, task);
            handle
        }

        fn cancel(&self, handle: TimerHandle) {
            if let Some(task) = self.tasks.borrow_mut().remove(&handle) {
                task.abort();
            }
        }
    }

}
