//! Counter events: INIT, INCREMENT, DECREMENT, SET.

use super::{kind_mismatch, CounterEvent, EventData, EventMessage};
use crate::chrono::TimePoint;
use crate::core::Result;
use crate::metrics::{Counter, MetricKind};

pub fn create_init_event(name: impl Into<String>, value: i64, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Counter(CounterEvent::Init(value)))
}

pub fn create_increment_event(name: impl Into<String>, delta: i64, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Counter(CounterEvent::Increment(delta)))
}

pub fn create_decrement_event(name: impl Into<String>, delta: i64, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Counter(CounterEvent::Decrement(delta)))
}

pub fn create_set_event(name: impl Into<String>, value: i64, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Counter(CounterEvent::Set(value)))
}

pub fn process_event(counter: &mut Counter, message: &EventMessage) -> Result<()> {
    let EventData::Counter(event) = message.data() else {
        return Err(kind_mismatch(MetricKind::Counter, message));
    };

    let timestamp = message.timestamp();
    match *event {
        CounterEvent::Init(value) => counter.init(value, timestamp),
        CounterEvent::Increment(delta) => counter.increment(delta, timestamp),
        CounterEvent::Decrement(delta) => counter.decrement(delta, timestamp),
        CounterEvent::Set(value) => counter.set(value, timestamp),
    }
    Ok(())
}
