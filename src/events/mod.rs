//! Typed event protocol.
//!
//! An [`EventMessage`] names its destination metric and carries an owned
//! payload. The payload is a sum type over every (destination, event)
//! pair, so the destination kind and event kind are always consistent
//! with the data, and ownership moves creator -> queue -> consumer ->
//! [`delete_event`] with exactly one owner at each step.
//!
//! Each destination kind has a submodule with one `create_*_event`
//! function per event kind and a `process_event` applier.

pub mod attribute;
pub mod counter;
pub mod gauge;
pub mod timer;

use crate::chrono::TimePoint;
use crate::core::{Result, StatsError};
use crate::metrics::{AttributeValue, Metric, MetricKind, SpanId};
use std::fmt;

/// Kind of metric an event is addressed to
pub type DestinationType = MetricKind;

/// Mutation an event performs on its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Init,
    Increment,
    Decrement,
    Set,
    Start,
    Stop,
    Discard,
    Heartbeat,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Init => "init",
            EventType::Increment => "increment",
            EventType::Decrement => "decrement",
            EventType::Set => "set",
            EventType::Start => "start",
            EventType::Stop => "stop",
            EventType::Discard => "discard",
            EventType::Heartbeat => "heartbeat",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CounterEvent {
    Init(i64),
    Increment(i64),
    Decrement(i64),
    Set(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GaugeEvent {
    Init(f64),
    Set(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    Init,
    Start(SpanId),
    Stop(SpanId),
    Discard(SpanId),
    Heartbeat(SpanId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeEvent {
    Set(AttributeValue),
}

/// Owned payload of an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    Counter(CounterEvent),
    Gauge(GaugeEvent),
    Timer(TimerEvent),
    Attribute(AttributeEvent),
}

impl EventData {
    pub fn destination_type(&self) -> DestinationType {
        match self {
            EventData::Counter(_) => MetricKind::Counter,
            EventData::Gauge(_) => MetricKind::Gauge,
            EventData::Timer(_) => MetricKind::Timer,
            EventData::Attribute(_) => MetricKind::Attribute,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            EventData::Counter(CounterEvent::Init(_))
            | EventData::Gauge(GaugeEvent::Init(_))
            | EventData::Timer(TimerEvent::Init) => EventType::Init,
            EventData::Counter(CounterEvent::Increment(_)) => EventType::Increment,
            EventData::Counter(CounterEvent::Decrement(_)) => EventType::Decrement,
            EventData::Counter(CounterEvent::Set(_))
            | EventData::Gauge(GaugeEvent::Set(_))
            | EventData::Attribute(AttributeEvent::Set(_)) => EventType::Set,
            EventData::Timer(TimerEvent::Start(_)) => EventType::Start,
            EventData::Timer(TimerEvent::Stop(_)) => EventType::Stop,
            EventData::Timer(TimerEvent::Discard(_)) => EventType::Discard,
            EventData::Timer(TimerEvent::Heartbeat(_)) => EventType::Heartbeat,
        }
    }
}

/// A single instrumentation event
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    destination_name: String,
    timestamp: TimePoint,
    data: EventData,
}

impl EventMessage {
    pub fn new(destination_name: impl Into<String>, timestamp: TimePoint, data: EventData) -> Self {
        Self {
            destination_name: destination_name.into(),
            timestamp,
            data,
        }
    }

    /// Name of the metric instance this event mutates
    pub fn destination_name(&self) -> &str {
        &self.destination_name
    }

    pub fn destination_type(&self) -> DestinationType {
        self.data.destination_type()
    }

    pub fn event_type(&self) -> EventType {
        self.data.event_type()
    }

    /// When the event was created; not used for ordering
    pub fn timestamp(&self) -> TimePoint {
        self.timestamp
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }
}

/// Apply `message` to `metric`, dispatching on the metric kind.
///
/// A message addressed to a different kind is a protocol error; the
/// metric is left untouched.
pub fn process_event(metric: &mut Metric, message: &EventMessage) -> Result<()> {
    match metric {
        Metric::Counter(counter) => counter::process_event(counter, message),
        Metric::Gauge(gauge) => gauge::process_event(gauge, message),
        Metric::Timer(timer) => timer::process_event(timer, message),
        Metric::Attribute(attr) => attribute::process_event(attr, message),
    }
}

/// Release a message and its payload. Taking it by value means it can
/// only happen once.
#[inline]
pub fn delete_event(message: EventMessage) {
    drop(message);
}

pub(crate) fn kind_mismatch(expected: MetricKind, message: &EventMessage) -> StatsError {
    StatsError::protocol(format!(
        "{} {} event sent to {} '{}'",
        message.destination_type(),
        message.event_type(),
        expected,
        message.destination_name()
    ))
}
