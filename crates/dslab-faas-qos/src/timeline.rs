//! Event timeline driving the simulated time forward.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::error::TimelineError;

pub type EventId = u64;

/// Kind of a scheduled event together with its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EventKind {
    /// Expiration check for an idle instance, valid only while the instance stays at `epoch`.
    Expire { instance: usize, epoch: u64 },
    /// End of service of `request` on `instance`.
    ServiceComplete { request: usize, instance: usize },
    /// Arrival of a new request.
    Arrival { request: usize },
}

impl EventKind {
    /// Events with equal timestamps are processed in increasing priority order,
    /// so an instance expiring at time t can not be reused by an arrival at the same time.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Expire { .. } => 0,
            Self::ServiceComplete { .. } => 1,
            Self::Arrival { .. } => 2,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Event {
    pub id: EventId,
    pub time: f64,
    pub kind: EventKind,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.kind.priority().cmp(&self.kind.priority()))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of future events keyed by (time, kind priority, insertion order).
#[derive(Clone, Default)]
pub struct Timeline {
    events: BinaryHeap<Event>,
    event_count: u64,
    last_popped: f64,
}

impl Timeline {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts a new event and returns its id.
    ///
    /// Panics if the event is scheduled before the last popped event, since it is not allowed to add
    /// events from the past.
    pub fn schedule(&mut self, time: f64, kind: EventKind) -> EventId {
        assert!(
            time >= self.last_popped,
            "event {:?} at {} is scheduled before the current time {}",
            kind,
            time,
            self.last_popped
        );
        let id = self.event_count;
        self.event_count += 1;
        self.events.push(Event { id, time, kind });
        id
    }

    /// Removes and returns the earliest event.
    pub fn pop_next(&mut self) -> Result<Event, TimelineError> {
        let event = self.events.pop().ok_or(TimelineError::Empty)?;
        self.last_popped = event.time;
        Ok(event)
    }

    /// Returns the time of the earliest event without removing it.
    pub fn peek_time(&self) -> Option<f64> {
        self.events.peek().map(|e| e.time)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total number of events scheduled so far.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_in_time_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(3., EventKind::Arrival { request: 2 });
        timeline.schedule(1., EventKind::Arrival { request: 0 });
        timeline.schedule(2., EventKind::Arrival { request: 1 });
        assert_eq!(timeline.peek_time(), Some(1.));
        let times: Vec<f64> = (0..3).map(|_| timeline.pop_next().unwrap().time).collect();
        assert_eq!(times, vec![1., 2., 3.]);
        assert_eq!(timeline.pop_next().unwrap_err(), TimelineError::Empty);
        assert_eq!(timeline.peek_time(), None);
    }

    #[test]
    fn test_tie_break_by_kind_then_insertion() {
        let mut timeline = Timeline::new();
        timeline.schedule(5., EventKind::Arrival { request: 0 });
        timeline.schedule(5., EventKind::ServiceComplete { request: 1, instance: 0 });
        timeline.schedule(5., EventKind::Expire { instance: 1, epoch: 0 });
        timeline.schedule(5., EventKind::Expire { instance: 2, epoch: 0 });
        timeline.schedule(5., EventKind::Arrival { request: 1 });
        let kinds: Vec<EventKind> = (0..5).map(|_| timeline.pop_next().unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Expire { instance: 1, epoch: 0 },
                EventKind::Expire { instance: 2, epoch: 0 },
                EventKind::ServiceComplete { request: 1, instance: 0 },
                EventKind::Arrival { request: 0 },
                EventKind::Arrival { request: 1 },
            ]
        );
    }

    #[test]
    #[should_panic]
    fn test_schedule_in_the_past() {
        let mut timeline = Timeline::new();
        timeline.schedule(2., EventKind::Arrival { request: 0 });
        timeline.pop_next().unwrap();
        timeline.schedule(1., EventKind::Arrival { request: 1 });
    }
}
