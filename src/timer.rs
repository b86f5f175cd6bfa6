//! Deadline-ordered timer queue for the single-threaded scene loop.
//!
//! Time is a [`Duration`] since scene mount. Nothing here reads a clock; the
//! owner passes `now` in, which keeps scheduling deterministic under test.

use std::time::Duration;

/// Identifies a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Pending<T> {
    id: TimerId,
    deadline: Duration,
    payload: T,
}

/// A timer that came due.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub id: TimerId,
    /// When the timer was scheduled to fire (not when it was polled)
    pub deadline: Duration,
    pub payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Schedule `payload` to fire at `deadline`.
    pub fn schedule(&mut self, deadline: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            deadline,
            payload,
        });
        id
    }

    /// Cancel a pending timer.
    ///
    /// Returns `false` if the timer already fired or was cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.pending.iter().position(|p| p.id == id) {
            Some(index) => {
                self.pending.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    /// Remove and return the earliest timer with `deadline <= now`.
    ///
    /// Timers sharing a deadline fire in scheduling order.
    pub fn pop_due(&mut self, now: Duration) -> Option<Fired<T>> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.deadline <= now)
            .min_by_key(|(_, p)| (p.deadline, p.id))
            .map(|(i, _)| i)?;

        let Pending {
            id,
            deadline,
            payload,
        } = self.pending.swap_remove(index);
        Some(Fired {
            id,
            deadline,
            payload,
        })
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(ms(300), "c");
        queue.schedule(ms(100), "a");
        queue.schedule(ms(200), "b");

        assert!(queue.pop_due(ms(50)).is_none());

        let fired: Vec<_> = std::iter::from_fn(|| queue.pop_due(ms(250)))
            .map(|f| f.payload)
            .collect();
        assert_eq!(fired, vec!["a", "b"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_deadline(), Some(ms(300)));
    }

    #[test]
    fn test_equal_deadlines_fire_fifo() {
        let mut queue = TimerQueue::new();
        queue.schedule(ms(10), 1);
        queue.schedule(ms(10), 2);
        queue.schedule(ms(10), 3);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop_due(ms(10)))
            .map(|f| f.payload)
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_fired_reports_scheduled_deadline() {
        let mut queue = TimerQueue::new();
        queue.schedule(ms(100), ());
        let fired = queue.pop_due(ms(5000)).unwrap();
        assert_eq!(fired.deadline, ms(100));
    }

    #[test]
    fn test_cancel_twice_is_noop() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(ms(100), ());
        assert!(queue.is_pending(id));

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(queue.pop_due(ms(1000)).is_none());
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(ms(100), ());
        assert!(queue.pop_due(ms(100)).is_some());
        assert!(!queue.cancel(id));
        assert!(queue.is_empty());
    }
}
