use super::types::SimTime;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug)]
pub struct ScheduledEvent<E> {
    pub due: SimTime,
    pub sequence_num: u64,
    pub event: E,
}

impl<E> PartialEq for ScheduledEvent<E> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.sequence_num == other.sequence_num
    }
}

impl<E> Eq for ScheduledEvent<E> {}

impl<E> PartialOrd for ScheduledEvent<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for ScheduledEvent<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.sequence_num.cmp(&self.sequence_num))
    }
}

/// Priority queue of timers keyed by absolute due time.
///
/// Events due at the same time pop in insertion order, which keeps a run
/// deterministic for a given seed.
pub struct EventScheduler<E> {
    event_queue: BinaryHeap<ScheduledEvent<E>>,
    sequence_counter: u64,
}

impl<E> EventScheduler<E> {
    /// Create a new EventScheduler
    pub fn new() -> Self {
        Self {
            event_queue: BinaryHeap::new(),
            sequence_counter: 0,
        }
    }

    /// Schedule an event at an absolute time
    pub fn schedule_at(&mut self, event: E, due: SimTime) {
        let scheduled_event = ScheduledEvent {
            due,
            sequence_num: self.sequence_counter,
            event,
        };

        self.event_queue.push(scheduled_event);
        self.sequence_counter += 1;
    }

    /// Schedule an event `delay` milliseconds after `now`
    pub fn schedule_in(&mut self, event: E, now: SimTime, delay: SimTime) {
        self.schedule_at(event, now.saturating_add(delay));
    }

    /// Pop the earliest event if it is due at or before `now`
    pub fn pop_due(&mut self, now: SimTime) -> Option<E> {
        match self.event_queue.peek() {
            Some(next) if next.due <= now => self.event_queue.pop().map(|scheduled| scheduled.event),
            _ => None,
        }
    }

    /// Check if there are any events remaining in the queue
    pub fn has_events(&self) -> bool {
        !self.event_queue.is_empty()
    }

    /// Get the next due time without removing events
    pub fn peek_next_due(&self) -> Option<SimTime> {
        self.event_queue.peek().map(|event| event.due)
    }

    pub fn len(&self) -> usize {
        self.event_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_queue.is_empty()
    }

    /// Drop every pending event
    pub fn clear(&mut self) {
        self.event_queue.clear();
    }
}

impl<E> Default for EventScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_due_order() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule_at("late", 300);
        scheduler.schedule_at("early", 100);
        scheduler.schedule_at("middle", 200);

        assert_eq!(scheduler.peek_next_due(), Some(100));
        assert_eq!(scheduler.pop_due(1000), Some("early"));
        assert_eq!(scheduler.pop_due(1000), Some("middle"));
        assert_eq!(scheduler.pop_due(1000), Some("late"));
        assert!(!scheduler.has_events());
    }

    #[test]
    fn test_same_due_time_keeps_insertion_order() {
        let mut scheduler = EventScheduler::new();
        for i in 0..5 {
            scheduler.schedule_at(i, 50);
        }

        let popped: Vec<_> = std::iter::from_fn(|| scheduler.pop_due(50)).collect();
        assert_eq!(popped, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pop_due_respects_now() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule_in("timer", 1000, 500);

        assert_eq!(scheduler.pop_due(1499), None);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.pop_due(1500), Some("timer"));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_schedule_in_saturates() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule_in((), SimTime::MAX - 1, 10);
        assert_eq!(scheduler.peek_next_due(), Some(SimTime::MAX));
    }
}
