//! Generic periodic refresh: mirror an external value by polling it.

use crate::transport::BoxFuture;
use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;
use std::time::Duration;

// Use web-time on WASM, std::time otherwise
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

type Fetch<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>>>;

/// Shared between the refresher and the fetch futures it hands out.
struct Shared<T> {
    value: RefCell<Option<T>>,
    generation: Cell<u64>,
    /// Sequence number of the newest fetch whose result has been applied.
    applied: Cell<u64>,
}

/// Polls `fetch` immediately on start and then every `interval`.
///
/// The driver (a timer in the browser, a loop in tests) calls [`PeriodicRefresh::tick`]
/// and runs the returned future. Each successful fetch replaces the value
/// wholesale; a failed fetch clears it. Results of fetches issued before a
/// [`PeriodicRefresh::stop`], or older than an already applied result, are dropped.
pub struct PeriodicRefresh<T, E> {
    interval: Duration,
    fetch: Fetch<T, E>,
    shared: Rc<Shared<T>>,
    next_due: Option<Instant>,
    issued: u64,
}

impl<T: 'static, E: Display + 'static> PeriodicRefresh<T, E> {
    pub fn new<F>(interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<T, E>> + 'static,
    {
        Self {
            interval,
            fetch: Box::new(fetch),
            shared: Rc::new(Shared {
                value: RefCell::new(None),
                generation: Cell::new(0),
                applied: Cell::new(0),
            }),
            next_due: None,
            issued: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Begin polling; returns the immediate first fetch.
    pub fn start(&mut self, now: Instant) -> BoxFuture<'static, ()> {
        self.next_due = Some(now + self.interval);
        self.issue()
    }

    /// Returns a fetch to run if one is due.
    pub fn tick(&mut self, now: Instant) -> Option<BoxFuture<'static, ()>> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        self.next_due = Some(now + self.interval);
        Some(self.issue())
    }

    /// Stop polling and forget the value. In-flight fetches will be ignored.
    pub fn stop(&mut self) {
        self.next_due = None;
        self.shared.generation.set(self.shared.generation.get() + 1);
        self.shared.value.borrow_mut().take();
    }

    fn issue(&mut self) -> BoxFuture<'static, ()> {
        self.issued += 1;
        let sequence = self.issued;
        let generation = self.shared.generation.get();
        let shared = self.shared.clone();
        let request = (self.fetch)();
        Box::pin(async move {
            let result = request.await;
            if shared.generation.get() != generation || shared.applied.get() > sequence {
                log::trace!("Dropping stale refresh result #{}", sequence);
                return;
            }
            shared.applied.set(sequence);
            match result {
                Ok(value) => *shared.value.borrow_mut() = Some(value),
                Err(e) => {
                    log::warn!("Refresh failed: {}", e);
                    shared.value.borrow_mut().take();
                }
            }
        })
    }

    pub fn with_value<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.shared.value.borrow().as_ref())
    }
}

impl<T: Clone + 'static, E: Display + 'static> PeriodicRefresh<T, E> {
    /// Last known value.
    pub fn value(&self) -> Option<T> {
        self.shared.value.borrow().clone()
    }
}
