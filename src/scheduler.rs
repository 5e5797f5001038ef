//! Recurring tick sources for the session timer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Identifies one armed recurring tick. Ticks carry the handle that
/// produced them so the timer can drop ticks from a cancelled source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A recurring clock that can be armed and disarmed.
pub trait Scheduler {
    /// Arms a recurring tick every `interval`.
    fn schedule(&mut self, interval: Duration) -> TickHandle;

    /// Disarms `handle`. Cancelling an unknown handle does nothing.
    fn cancel(&mut self, handle: TickHandle);
}

/// Ticks from background threads, delivered over a channel to the thread
/// that owns the timer.
pub struct ThreadScheduler {
    tx: Sender<TickHandle>,
    next_id: u64,
    active: HashMap<TickHandle, Arc<AtomicBool>>,
}

impl ThreadScheduler {
    pub fn new(tx: Sender<TickHandle>) -> Self {
        Self {
            tx,
            next_id: 1,
            active: HashMap::new(),
        }
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&mut self, interval: Duration) -> TickHandle {
        let handle = TickHandle(self.next_id);
        self.next_id += 1;

        let alive = Arc::new(AtomicBool::new(true));
        self.active.insert(handle, Arc::clone(&alive));

        let tx = self.tx.clone();
        thread::spawn(move || loop {
            thread::sleep(interval);
            if !alive.load(Ordering::SeqCst) {
                break;
            }
            if tx.send(handle).is_err() {
                // Receiver gone, nobody left to tick
                break;
            }
        });

        debug!(handle = handle.id(), "tick source armed");
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        if let Some(alive) = self.active.remove(&handle) {
            alive.store(false, Ordering::SeqCst);
            debug!(handle = handle.id(), "tick source cancelled");
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        for alive in self.active.values() {
            alive.store(false, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Default)]
struct ManualInner {
    next_id: u64,
    active: Vec<TickHandle>,
    scheduled: usize,
}

/// Scheduler that never fires on its own: the owner calls `tick` by hand.
/// Clones share state, so a caller can inspect what the timer armed.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles currently armed.
    pub fn active(&self) -> Vec<TickHandle> {
        self.inner.borrow().active.clone()
    }

    /// The single armed handle, if exactly one is armed.
    pub fn current(&self) -> Option<TickHandle> {
        match self.inner.borrow().active.as_slice() {
            [handle] => Some(*handle),
            _ => None,
        }
    }

    /// Total number of `schedule` calls so far.
    pub fn scheduled_count(&self) -> usize {
        self.inner.borrow().scheduled
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, _interval: Duration) -> TickHandle {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        inner.scheduled += 1;
        let handle = TickHandle(inner.next_id);
        inner.active.push(handle);
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.inner.borrow_mut().active.retain(|h| *h != handle);
    }
}
