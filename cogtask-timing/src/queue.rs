use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

/// Handle returned when a callback is registered; used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// A callback that has come due.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<E> {
    pub id: TimerId,
    pub deadline: u64,
    pub event: E,
}

/// Host timer facility: register an event for a deadline, cancel by handle,
/// and hand back a specific callback by handle.
///
/// One scheduler may serve several runs at once, so callers look up and take
/// only the handles they registered.
pub trait Scheduler<E> {
    fn schedule(&mut self, deadline: u64, event: E) -> TimerId;

    /// Returns `false` if the handle was unknown or already fired.
    fn cancel(&mut self, id: TimerId) -> bool;

    /// Deadline of a registered, unfired callback.
    fn deadline_of(&self, id: TimerId) -> Option<u64>;

    /// Removes the callback and hands it back.
    fn take(&mut self, id: TimerId) -> Option<Fired<E>>;

    fn next_deadline(&self) -> Option<u64>;

    fn pending(&self) -> usize;
}

/// Deadline-ordered queue. Equal deadlines fire in registration order.
/// Cancelled entries are dropped lazily from the heap.
#[derive(Debug)]
pub struct TimerQueue<E> {
    heap: BinaryHeap<Reverse<(u64, u64)>>,
    events: HashMap<u64, (u64, E)>,
    next_id: u64,
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            events: HashMap::new(),
            next_id: 0,
        }
    }

    /// Pops the earliest callback whose deadline is `<= now`, whoever
    /// registered it.
    pub fn pop_due(&mut self, now: u64) -> Option<Fired<E>> {
        self.discard_cancelled();
        let Reverse((deadline, id)) = *self.heap.peek()?;
        if deadline > now {
            return None;
        }
        self.take(TimerId(id))
    }

    fn discard_cancelled(&mut self) {
        while let Some(Reverse((_, id))) = self.heap.peek() {
            if self.events.contains_key(id) {
                break;
            }
            self.heap.pop();
        }
    }
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> for TimerQueue<E> {
    fn schedule(&mut self, deadline: u64, event: E) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((deadline, id)));
        self.events.insert(id, (deadline, event));
        TimerId(id)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.take(id).is_some()
    }

    fn deadline_of(&self, id: TimerId) -> Option<u64> {
        self.events.get(&id.0).map(|(deadline, _)| *deadline)
    }

    fn take(&mut self, id: TimerId) -> Option<Fired<E>> {
        let (deadline, event) = self.events.remove(&id.0)?;
        self.discard_cancelled();
        Some(Fired {
            id,
            deadline,
            event,
        })
    }

    fn next_deadline(&self) -> Option<u64> {
        self.heap
            .iter()
            .filter(|Reverse((_, id))| self.events.contains_key(id))
            .map(|Reverse((deadline, _))| *deadline)
            .min()
    }

    fn pending(&self) -> usize {
        self.events.len()
    }
}
