//! Time-ordered one-shot alarms consumed by the control loop.
//!
//! Alarms are plain data: the queue never calls anything.  The control loop
//! asks for [`AlarmQueue::pop_due`] once per tick and dispatches what comes
//! out.  Time is always passed in, so tests can run without sleeping.
//!
//! Cancelled alarms leave a stale heap entry behind; it is discarded when
//! it reaches the top.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use super::activation::DriverClass;

/// What the daemon schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    /// Try to start the driver of this class again.
    RetryDriver(DriverClass),
}

/// Handle for cancelling a scheduled alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmId(u64);

#[derive(Debug)]
pub struct AlarmQueue<T> {
    deadlines: BinaryHeap<Reverse<(Instant, u64)>>,
    payloads: HashMap<u64, T>,
    next_id: u64,
}

impl<T> Default for AlarmQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AlarmQueue<T> {
    pub fn new() -> Self {
        Self { deadlines: BinaryHeap::new(), payloads: HashMap::new(), next_id: 0 }
    }

    /// Schedules `payload` for `at`.  Alarms with equal deadlines fire in
    /// scheduling order.
    pub fn schedule(&mut self, at: Instant, payload: T) -> AlarmId {
        let id = self.next_id;
        self.next_id += 1;
        self.deadlines.push(Reverse((at, id)));
        self.payloads.insert(id, payload);
        AlarmId(id)
    }

    /// Cancels an alarm, returning its payload if it had not fired yet.
    pub fn cancel(&mut self, id: AlarmId) -> Option<T> {
        self.payloads.remove(&id.0)
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_cancelled();
        self.deadlines.peek().map(|Reverse((at, _))| *at)
    }

    /// Removes and returns the earliest alarm due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        self.discard_cancelled();
        let Reverse((at, id)) = *self.deadlines.peek()?;
        if at > now {
            return None;
        }
        self.deadlines.pop();
        self.payloads.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    fn discard_cancelled(&mut self) {
        while let Some(Reverse((_, id))) = self.deadlines.peek() {
            if self.payloads.contains_key(id) {
                break;
            }
            self.deadlines.pop();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_alarm_is_not_due_before_its_deadline() {
        // Arrange
        let start = Instant::now();
        let mut queue = AlarmQueue::new();
        queue.schedule(start + Duration::from_secs(5), "retry");

        // Act / Assert
        assert_eq!(queue.pop_due(start + Duration::from_secs(4)), None);
        assert_eq!(queue.pop_due(start + Duration::from_secs(5)), Some("retry"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_alarms_fire_in_deadline_order() {
        let start = Instant::now();
        let mut queue = AlarmQueue::new();
        queue.schedule(start + Duration::from_millis(30), 3);
        queue.schedule(start + Duration::from_millis(10), 1);
        queue.schedule(start + Duration::from_millis(20), 2);
        queue.schedule(start + Duration::from_millis(20), 22);

        let later = start + Duration::from_secs(1);
        let fired: Vec<i32> = std::iter::from_fn(|| queue.pop_due(later)).collect();

        assert_eq!(fired, vec![1, 2, 22, 3]);
    }

    #[test]
    fn test_cancelled_alarm_never_fires() {
        // Arrange
        let start = Instant::now();
        let mut queue = AlarmQueue::new();
        let first = queue.schedule(start, Alarm::RetryDriver(DriverClass::Braille));
        queue.schedule(start + Duration::from_millis(5), Alarm::RetryDriver(DriverClass::Speech));

        // Act
        let cancelled = queue.cancel(first);

        // Assert
        assert_eq!(cancelled, Some(Alarm::RetryDriver(DriverClass::Braille)));
        assert_eq!(queue.cancel(first), None);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_deadline(), Some(start + Duration::from_millis(5)));
        assert_eq!(
            queue.pop_due(start + Duration::from_millis(5)),
            Some(Alarm::RetryDriver(DriverClass::Speech))
        );
    }

    #[test]
    fn test_empty_queue_has_no_deadline() {
        let mut queue: AlarmQueue<()> = AlarmQueue::default();

        assert_eq!(queue.next_deadline(), None);
        assert_eq!(queue.pop_due(Instant::now()), None);
    }
}
