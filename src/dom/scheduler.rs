//! Scheduler - Virtual clock and cancelable timers.
//!
//! Every deferred behavior in the engine (tooltip delays, typeahead expiry,
//! deferred focus) is a timer on a [`Scheduler`]. The host drives the clock by
//! calling [`Scheduler::advance`] from its event loop, which makes timing fully
//! deterministic under test.
//!
//! [`TaskSlots`] is the per-instance owner of timer handles: one named slot
//! per kind of deferred work. Scheduling into a slot supersedes whatever was
//! pending there, and a callback only runs while it is still the slot's
//! authoritative task.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = Scheduler::new();
//! let slots = TaskSlots::new(scheduler.clone());
//! slots.schedule("open", 300, || println!("open!"));
//! scheduler.advance(299); // nothing
//! scheduler.advance(1);   // "open!"
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// SCHEDULER
// =============================================================================

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Timer {
    id: TimerId,
    deadline: u64,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct SchedulerState {
    now: u64,
    next_id: u64,
    timers: Vec<Timer>,
}

/// Shared virtual clock. Cloning shares the clock.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerState>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("now", &state.now)
            .field("pending", &state.timers.len())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.inner.borrow().now
    }

    /// Run `callback` once `delay_ms` milliseconds have elapsed.
    pub fn set_timeout(&self, delay_ms: u64, callback: impl FnOnce() + 'static) -> TimerId {
        let mut state = self.inner.borrow_mut();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        let deadline = state.now.saturating_add(delay_ms);
        state.timers.push(Timer {
            id,
            deadline,
            callback: Box::new(callback),
        });
        id
    }

    /// Cancel a pending timer. Returns `false` if it already fired or was cancelled.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut state = self.inner.borrow_mut();
        let before = state.timers.len();
        state.timers.retain(|timer| timer.id != id);
        state.timers.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.inner.borrow().timers.iter().any(|timer| timer.id == id)
    }

    /// Number of timers not yet fired.
    pub fn pending(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Advance the clock by `ms`, firing due timers in deadline order.
    ///
    /// Timers scheduled by callbacks fire in the same call if their deadline
    /// falls inside the window. Returns the number of timers fired.
    pub fn advance(&self, ms: u64) -> usize {
        let target = self.now().saturating_add(ms);
        let mut fired = 0;
        loop {
            let next = {
                let mut state = self.inner.borrow_mut();
                let due = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.deadline <= target)
                    .min_by_key(|(_, timer)| (timer.deadline, timer.id))
                    .map(|(position, _)| position);
                due.map(|position| {
                    let timer = state.timers.remove(position);
                    state.now = state.now.max(timer.deadline);
                    timer
                })
            };
            match next {
                Some(timer) => {
                    tracing::trace!(timer = ?timer.id, at = timer.deadline, "timer fired");
                    (timer.callback)();
                    fired += 1;
                }
                None => break,
            }
        }
        self.inner.borrow_mut().now = target;
        fired
    }

    /// Fire timers that are already due (zero-delay continuations).
    pub fn run_pending(&self) -> usize {
        self.advance(0)
    }

    /// Drop all timers and reset the clock (for testing).
    pub fn reset(&self) {
        let mut state = self.inner.borrow_mut();
        state.timers.clear();
        state.now = 0;
    }
}

// =============================================================================
// TASK SLOTS
// =============================================================================

#[derive(Default)]
struct SlotTable {
    /// slot -> (generation, timer)
    active: HashMap<&'static str, (u64, TimerId)>,
}

/// Per-instance timer ownership with one authoritative task per slot.
#[derive(Clone)]
pub struct TaskSlots {
    scheduler: Scheduler,
    table: Rc<RefCell<SlotTable>>,
    generation: Rc<Cell<u64>>,
}

impl TaskSlots {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            table: Rc::new(RefCell::new(SlotTable::default())),
            generation: Rc::new(Cell::new(0)),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Schedule `task` in `slot`, cancelling whatever was pending there.
    pub fn schedule(&self, slot: &'static str, delay_ms: u64, task: impl FnOnce() + 'static) {
        self.cancel(slot);

        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let table = Rc::downgrade(&self.table);
        let id = self.scheduler.set_timeout(delay_ms, move || {
            let Some(table) = table.upgrade() else { return };
            let authoritative = {
                let mut table = table.borrow_mut();
                match table.active.get(slot) {
                    Some((current, _)) if *current == generation => {
                        table.active.remove(slot);
                        true
                    }
                    _ => false,
                }
            };
            if authoritative {
                task();
            }
        });
        self.table.borrow_mut().active.insert(slot, (generation, id));
    }

    /// Cancel the task pending in `slot`. Returns `true` if one was pending.
    pub fn cancel(&self, slot: &'static str) -> bool {
        let entry = self.table.borrow_mut().active.remove(slot);
        match entry {
            Some((_, id)) => self.scheduler.clear_timeout(id),
            None => false,
        }
    }

    pub fn is_pending(&self, slot: &'static str) -> bool {
        self.table.borrow().active.contains_key(slot)
    }

    /// Cancel every pending task.
    pub fn cancel_all(&self) {
        let entries: Vec<TimerId> = self
            .table
            .borrow_mut()
            .active
            .drain()
            .map(|(_, (_, id))| id)
            .collect();
        for id in entries {
            self.scheduler.clear_timeout(id);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.table.borrow().active.len()
    }
}
